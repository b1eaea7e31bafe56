#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Terminal front end for parcel downloads.
//!
//! Provides an `indicatif` tile bar behind the [`ProgressCallback`] trait,
//! a `dialoguer` [`Prompter`], and [`init_logger`] which sets up
//! `indicatif-log-bridge` so that `log::info!` and friends are suspended
//! while the bar redraws.

use std::sync::Arc;
use std::time::Duration;

use dialoguer::Confirm;
use indicatif::{ProgressBar, ProgressStyle};
use parcel_wfs_download::{
    interaction::Prompter,
    progress::ProgressCallback,
};

pub use indicatif::MultiProgress;

/// An `indicatif` [`ProgressBar`] that implements [`ProgressCallback`].
pub struct IndicatifProgress {
    bar: ProgressBar,
    /// Style to switch to once `set_total()` provides a known length.
    bar_style: ProgressStyle,
}

impl IndicatifProgress {
    /// Creates a tile bar that spins while the area is being prepared and
    /// becomes a full bar once the number of tiles is known.
    #[must_use]
    pub fn tiles_bar(multi: &MultiProgress, message: &str) -> Arc<dyn ProgressCallback> {
        let bar = multi.add(ProgressBar::new_spinner());
        bar.enable_steady_tick(Duration::from_millis(100));
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.set_message(message.to_string());

        let bar_style = ProgressStyle::with_template(
            "  {wide_bar:.cyan/dim} {pos}/{len} tiles [{elapsed_precise}] {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("##-");

        Arc::new(Self { bar, bar_style })
    }
}

impl ProgressCallback for IndicatifProgress {
    fn set_total(&self, total: u64) {
        self.bar.set_length(total);
        self.bar.set_position(0);
        self.bar.set_style(self.bar_style.clone());
    }

    fn set_position(&self, pos: u64) {
        self.bar.set_position(pos);
    }

    fn set_message(&self, msg: String) {
        self.bar.set_message(msg);
    }

    fn finish_and_clear(&self) {
        self.bar.finish_and_clear();
    }
}

/// Asks yes/no questions on the terminal.
///
/// The bar is hidden while the question is shown so the prompt is not
/// redrawn over. `default` is the answer preselected on the terminal. A
/// prompt that cannot be shown (no TTY) always answers no.
pub struct TerminalPrompter {
    multi: MultiProgress,
    default: bool,
}

impl TerminalPrompter {
    /// Creates a prompter suspending bars of `multi` while asking.
    #[must_use]
    pub const fn new(multi: MultiProgress, default: bool) -> Self {
        Self { multi, default }
    }
}

impl Prompter for TerminalPrompter {
    fn ask_yes_no(&self, title: &str, message: &str) -> bool {
        self.multi.suspend(|| {
            println!("\n{title}\n{message}");
            let answer = Confirm::new()
                .with_prompt(title)
                .default(self.default)
                .interact();
            answer_or_decline(title, answer)
        })
    }
}

fn answer_or_decline(title: &str, answer: dialoguer::Result<bool>) -> bool {
    answer.unwrap_or_else(|e| {
        log::warn!("Could not ask '{title}' ({e}); answering no");
        false
    })
}

/// Initializes the global logger wrapped in `indicatif-log-bridge` so that
/// `log::info!` and friends are suspended while progress bars redraw.
///
/// Returns the [`MultiProgress`] that all progress bars must be added to.
#[must_use]
pub fn init_logger() -> MultiProgress {
    let multi = MultiProgress::new();

    let logger = pretty_env_logger::formatted_builder()
        .parse_env("RUST_LOG")
        .build();
    let level = logger.filter();

    indicatif_log_bridge::LogWrapper::new(multi.clone(), logger)
        .try_init()
        .ok(); // Already set in tests

    log::set_max_level(level);

    multi
}
