use horizon::{Progress, Stage};
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};

pub fn bar(header: &str) -> ProgressBar {
    let pb = ProgressBar::new(0);
    pb.set_prefix(header.to_owned());
    pb.set_style(
        ProgressStyle::with_template("{prefix}...\n[{wide_bar:.cyan/blue}] {pos}/{len}")
            .expect("incorrect progress bar format string")
            .progress_chars("#>-"),
    );
    pb
}

/// One bar per [`Stage`], drawn to stderr.
pub struct Bars {
    sweep: ProgressBar,
    link: ProgressBar,
}

impl Bars {
    pub fn new(quiet: bool) -> Self {
        let multi = MultiProgress::new();
        if quiet {
            multi.set_draw_target(ProgressDrawTarget::hidden());
        }
        Self {
            sweep: multi.add(bar("Sweeping")),
            link: multi.add(bar("Linking ridges")),
        }
    }

    /// Sweeps may end early, leaving their bar short of its length.
    pub fn finish(&self) {
        self.sweep.finish();
        self.link.finish();
    }
}

impl Progress for Bars {
    fn report(&self, stage: Stage, done: u64, total: u64) {
        let pb = match stage {
            Stage::Sweep => &self.sweep,
            Stage::Link => &self.link,
        };
        pb.set_length(total);
        pb.set_position(done);
        if done >= total {
            pb.finish();
        }
    }
}
