//! gnuplot script generation and the render thread that owns the plot stream.

pub mod gnuplot;
pub mod render;
pub mod script;

pub use gnuplot::{Gnuplot, PlotSink, ScriptWriter};
pub use render::spawn_renderer;
pub use script::Plot;
