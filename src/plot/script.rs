use std::io::{self, Write};

use crate::spectrum::psd::bin_frequency;
use crate::spectrum::{FrameLayout, PsdVector, StftMatrix};

/// Which product a plot shows. The renderer keeps the latest plot of each kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PlotKind {
    Stft,
    Psd,
}

#[derive(Clone, Debug, PartialEq)]
pub enum PlotData {
    /// `plot '-'`: one `(x, y)` per line.
    Line(Vec<(f64, f64)>),
    /// `splot '-'`: one scan line of `(x, y, z)` per outer entry, separated by
    /// blank lines so gnuplot treats the data as a grid.
    Surface(Vec<Vec<(f64, f64, f64)>>),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Plot {
    pub kind: PlotKind,
    pub title: String,
    pub xlabel: String,
    pub ylabel: String,
    pub zlabel: Option<String>,
    /// Generation of the product the plot was built from.
    pub generation: u64,
    pub data: PlotData,
}

impl Plot {
    /// Frequency vs. power line plot.
    pub fn psd(psd: &PsdVector, sample_rate: f64) -> Self {
        let size = psd.bins();
        let points = psd
            .power
            .iter()
            .enumerate()
            .map(|(k, &p)| (bin_frequency(k, sample_rate, size), p))
            .collect();

        Self {
            kind: PlotKind::Psd,
            title: "PSD Plot".into(),
            xlabel: "Frequency (Hz)".into(),
            ylabel: "Power".into(),
            zlabel: None,
            generation: psd.generation,
            data: PlotData::Line(points),
        }
    }

    /// Time (frame start sample) vs. frequency vs. magnitude surface.
    pub fn stft(matrix: &StftMatrix, layout: &FrameLayout, sample_rate: f64) -> Self {
        let bins = matrix.bins();
        let scans = matrix
            .iter_rows()
            .enumerate()
            .map(|(i, row)| {
                let time = layout.frame_range(i).start as f64;
                row.iter()
                    .enumerate()
                    .map(|(k, x)| (time, bin_frequency(k, sample_rate, bins), x.norm()))
                    .collect()
            })
            .collect();

        Self {
            kind: PlotKind::Stft,
            title: "STFT Plot".into(),
            xlabel: "Time (samples)".into(),
            ylabel: "Frequency (Hz)".into(),
            zlabel: Some("Magnitude".into()),
            generation: matrix.generation,
            data: PlotData::Surface(scans),
        }
    }

    fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        writeln!(w, "set title '{}'", escape(&self.title))?;
        writeln!(w, "set xlabel '{}'", escape(&self.xlabel))?;
        writeln!(w, "set ylabel '{}'", escape(&self.ylabel))?;

        match &self.data {
            PlotData::Line(points) => {
                writeln!(w, "plot '-' with lines notitle")?;
                for (x, y) in points {
                    writeln!(w, "{} {}", x, y)?;
                }
            }
            PlotData::Surface(scans) => {
                if let Some(ref z) = self.zlabel {
                    writeln!(w, "set zlabel '{}'", escape(z))?;
                }
                writeln!(w, "splot '-' with lines notitle")?;
                for (i, scan) in scans.iter().enumerate() {
                    if i > 0 {
                        writeln!(w)?;
                    }
                    for (x, y, z) in scan {
                        writeln!(w, "{} {} {}", x, y, z)?;
                    }
                }
            }
        }

        writeln!(w, "e")
    }
}

/// Writes a complete gnuplot script drawing `plots`, side by side when there
/// is more than one.
pub fn write_script<W: Write>(w: &mut W, plots: &[&Plot]) -> io::Result<()> {
    if plots.is_empty() {
        return Ok(());
    }

    let multi = plots.len() > 1;
    if multi {
        writeln!(w, "set multiplot layout 1,{}", plots.len())?;
    }
    for plot in plots {
        plot.write_to(w)?;
    }
    if multi {
        writeln!(w, "unset multiplot")?;
    }
    w.flush()
}

// gnuplot single-quoted strings only need the quote doubled
fn escape(s: &str) -> String {
    s.replace('\'', "''")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(plots: &[&Plot]) -> String {
        let mut out = Vec::new();
        write_script(&mut out, plots).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn psd_script_has_header_rows_and_terminator() {
        let psd = PsdVector {
            power: vec![4.0, 1.0, 0.0, 1.0],
            generation: 3,
        };
        let plot = Plot::psd(&psd, 8.0);
        assert_eq!(plot.generation, 3);

        let script = render(&[&plot]);
        assert_eq!(
            script,
            "set title 'PSD Plot'\n\
             set xlabel 'Frequency (Hz)'\n\
             set ylabel 'Power'\n\
             plot '-' with lines notitle\n\
             0 4\n\
             2 1\n\
             4 0\n\
             6 1\n\
             e\n"
        );
    }

    #[test]
    fn stft_script_separates_scans() {
        let layout = FrameLayout::new(8, 4, 2, None).unwrap();
        let matrix = StftMatrix::zeroed(layout.frame_count(), layout.frame_len());
        let plot = Plot::stft(&matrix, &layout, 4.0);

        let script = render(&[&plot]);
        assert!(script.contains("set zlabel 'Magnitude'\n"));
        assert!(script.contains("splot '-' with lines notitle\n"));

        let data: Vec<&str> = script
            .lines()
            .skip_while(|l| !l.starts_with("splot"))
            .skip(1)
            .collect();
        // 3 frames of 4 bins, 2 separators, terminator
        assert_eq!(data.len(), 3 * 4 + 2 + 1);
        assert_eq!(data[0], "0 0 0");
        assert_eq!(data[4], "");
        assert_eq!(data[5], "2 0 0");
        assert_eq!(*data.last().unwrap(), "e");
    }

    #[test]
    fn two_plots_use_multiplot() {
        let psd = Plot::psd(&PsdVector::zeroed(2), 2.0);
        let layout = FrameLayout::new(4, 2, 2, None).unwrap();
        let stft = Plot::stft(&StftMatrix::for_layout(&layout), &layout, 2.0);

        let script = render(&[&stft, &psd]);
        assert!(script.starts_with("set multiplot layout 1,2\n"));
        assert!(script.ends_with("e\nunset multiplot\n"));
        assert_eq!(script.matches("\ne\n").count(), 2);
    }

    #[test]
    fn nothing_to_draw_writes_nothing() {
        assert!(render(&[]).is_empty());
    }

    #[test]
    fn quotes_in_titles_are_escaped() {
        assert_eq!(escape("it's"), "it''s");
    }
}
