use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

use anyhow::Result;
use eframe::egui::{Align2, Color32, FontId, Rect, Sense, Stroke, Ui, pos2, vec2};
use storymap::config::{StatsConfig, StoryConfig};
use storymap::data::Dataset;
use storymap::data::stats::{LoadedStats, PermutationStats, Series, StatsSource, stats_file_name};
use storymap::interaction::histogram::{FeatureSelection, HistogramUpdater};
use tracing::{debug, warn};

const MARGIN: f32 = 40.0;

type StatsReply = (Vec<String>, Result<PermutationStats>);

pub(super) struct StatsView {
    source: Dataset<StatsSource>,
    config: StatsConfig,
    histogram: HistogramUpdater,
    selection: FeatureSelection,
    initial: Option<PermutationStats>,
    pending: Option<Receiver<StatsReply>>,
    last_error: Option<String>,
}

impl StatsView {
    pub(super) fn new(stats: Dataset<LoadedStats>, config: &StoryConfig) -> Self {
        let config = config.stats.clone();
        let (source, selected, initial) = match stats {
            Dataset::Ready(loaded) => (Dataset::Ready(loaded.source), loaded.selected, Some(loaded.stats)),
            Dataset::Unavailable(reason) => (Dataset::Unavailable(reason), Vec::new(), None),
        };
        Self {
            source,
            histogram: HistogramUpdater::new(config.clone(), vec2(1.0, 1.0)),
            selection: FeatureSelection::new(selected, config.lockout()),
            config,
            initial,
            pending: None,
            last_error: None,
        }
    }

    pub(super) fn bin_count(&self) -> usize {
        self.histogram
            .stats()
            .or(self.initial.as_ref())
            .map_or(0, |stats| stats.xs.len())
    }

    pub(super) fn features(&self) -> &[String] {
        match self.source.ready() {
            Some(source) => source.features(),
            None => &[],
        }
    }

    pub(super) fn selection(&self) -> &FeatureSelection {
        &self.selection
    }

    pub(super) fn file_name(&self) -> String {
        self.source.ready().map_or_else(String::new, |source| {
            let path = source.path_for(self.selection.selected());
            path.file_name()
                .map_or_else(|| path.display().to_string(), |name| name.to_string_lossy().into_owned())
        })
    }

    pub(super) fn is_loading(&self) -> bool {
        self.pending.is_some()
    }

    pub(super) fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub(super) fn is_visible(&self, series: Series) -> bool {
        self.histogram.is_visible(series)
    }

    pub(super) fn set_visible(&mut self, series: Series, visible: bool, now: f64) {
        self.histogram.set_visible(series, visible, now);
    }

    pub(super) fn series_color(&self, series: Series) -> Color32 {
        self.histogram
            .series_color(series)
            .with_opacity(self.config.opacity)
    }

    pub(super) fn toggle_feature(&mut self, feature: &str, now: f64) {
        let Some(source) = self.source.ready() else {
            return;
        };
        let Some(selected) = self.selection.toggle(feature, now) else {
            return;
        };

        debug!(file = %stats_file_name(&selected), "reloading stats");
        let (tx, rx) = mpsc::channel();
        let source = source.clone();
        thread::spawn(move || {
            let result = source.load(&selected);
            let _ = tx.send((selected, result));
        });
        self.pending = Some(rx);
    }

    fn poll(&mut self, now: f64) {
        if let Some(initial) = self.initial.take() {
            self.histogram.update(initial, now);
        }

        let Some(rx) = self.pending.take() else {
            return;
        };
        match rx.try_recv() {
            Ok((selected, result)) => {
                if !self.selection.is_current(&selected) {
                    return;
                }
                match result {
                    Ok(stats) => {
                        self.last_error = None;
                        self.histogram.update(stats, now);
                    }
                    Err(error) => {
                        let message = format!("{error:#}");
                        warn!(error = %message, "stats selection unavailable");
                        self.last_error = Some(message);
                    }
                }
            }
            Err(TryRecvError::Empty) => self.pending = Some(rx),
            Err(TryRecvError::Disconnected) => {
                self.last_error = Some("stats loader disconnected".to_owned());
            }
        }
    }

    pub(super) fn draw(&mut self, ui: &mut Ui, now: f64) {
        if let Dataset::Unavailable(reason) = &self.source {
            let reason = reason.clone();
            ui.vertical_centered(|ui| {
                ui.add_space(80.0);
                ui.heading("Histogram data unavailable");
                ui.label(reason);
            });
            return;
        }

        let (rect, _response) = ui.allocate_exact_size(ui.available_size(), Sense::hover());
        let painter = ui.painter_at(rect);
        painter.rect_filled(rect, 0.0, Color32::from_rgb(250, 250, 248));

        let plot = Rect::from_min_max(
            rect.min + vec2(MARGIN, MARGIN / 2.0),
            rect.max - vec2(MARGIN / 2.0, MARGIN),
        );
        self.histogram.resize(plot.size(), now);
        self.poll(now);
        self.histogram.prune(now);

        for bar in self.histogram.bars() {
            let geometry = bar.geometry(now);
            painter.rect_filled(geometry.rect(plot.min), 0.0, bar.color.with_opacity(geometry.opacity));
        }

        let axis = Stroke::new(1.0, Color32::from_gray(60));
        painter.line_segment([plot.left_bottom(), plot.right_bottom()], axis);
        painter.line_segment([plot.left_bottom(), plot.left_top()], axis);

        if let Some(stats) = self.histogram.stats()
            && let Some((x_min, x_max)) = stats.x_extent()
        {
            let tick_font = FontId::proportional(11.0);
            for (value, x, align) in [
                (x_min, plot.left(), Align2::LEFT_TOP),
                (x_max, plot.right(), Align2::RIGHT_TOP),
            ] {
                painter.text(
                    pos2(x, plot.bottom() + 4.0),
                    align,
                    format!("{value:.2}"),
                    tick_font.clone(),
                    Color32::from_gray(60),
                );
            }
            painter.text(
                plot.left_top() - vec2(4.0, 0.0),
                Align2::RIGHT_TOP,
                format!("{:.0}", stats.y_max()),
                tick_font,
                Color32::from_gray(60),
            );
        }

        if self.histogram.is_animating(now) || self.pending.is_some() || self.selection.is_locked(now) {
            ui.ctx().request_repaint();
        }
    }
}
