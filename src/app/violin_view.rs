use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

use anyhow::Result;
use eframe::egui::{Align2, Color32, FontId, Mesh, Rect, Sense, Shape, Stroke, Ui, pos2, vec2};
use storymap::config::{StoryConfig, ViolinConfig};
use storymap::data::Dataset;
use storymap::data::violin::{LoadedViolins, ViolinCatalog, ViolinGroup};
use storymap::interaction::violin::ViolinUpdater;
use tracing::{debug, warn};

use super::render_utils::outline_polygon;

const MARGIN: f32 = 40.0;

type ViolinReply = (String, Result<Vec<ViolinGroup>>);

pub(super) struct ViolinView {
    catalog: Dataset<ViolinCatalog>,
    config: ViolinConfig,
    updater: ViolinUpdater,
    feature: String,
    initial: Option<Vec<ViolinGroup>>,
    pending: Option<Receiver<ViolinReply>>,
    last_error: Option<String>,
}

impl ViolinView {
    pub(super) fn new(violins: Dataset<LoadedViolins>, config: &StoryConfig) -> Self {
        let config = config.violin.clone();
        let (catalog, feature, initial) = match violins {
            Dataset::Ready(loaded) => (Dataset::Ready(loaded.catalog), loaded.feature, Some(loaded.groups)),
            Dataset::Unavailable(reason) => (Dataset::Unavailable(reason), config.default_feature.clone(), None),
        };
        Self {
            catalog,
            updater: ViolinUpdater::new(config.clone(), vec2(1.0, 1.0)),
            config,
            feature,
            initial,
            pending: None,
            last_error: None,
        }
    }

    pub(super) fn features(&self) -> &[String] {
        match self.catalog.ready() {
            Some(catalog) => &catalog.features,
            None => &[],
        }
    }

    pub(super) fn feature(&self) -> &str {
        &self.feature
    }

    pub(super) fn group_count(&self) -> usize {
        self.updater.violins().iter().filter(|violin| !violin.is_exiting()).count()
    }

    pub(super) fn is_loading(&self) -> bool {
        self.pending.is_some()
    }

    pub(super) fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub(super) fn group_sizes(&self) -> Vec<(&str, usize)> {
        self.updater
            .violins()
            .iter()
            .filter(|violin| !violin.is_exiting())
            .map(|violin| (violin.group.as_str(), violin.count))
            .collect()
    }

    pub(super) fn select_feature(&mut self, feature: &str) {
        if feature == self.feature {
            return;
        }
        let Some(catalog) = self.catalog.ready() else {
            return;
        };
        self.feature = feature.to_owned();

        debug!(feature, "reloading violins");
        let (tx, rx) = mpsc::channel();
        let catalog = catalog.clone();
        let feature = feature.to_owned();
        thread::spawn(move || {
            let result = catalog.load(&feature);
            let _ = tx.send((feature, result));
        });
        self.pending = Some(rx);
    }

    fn poll(&mut self, now: f64) {
        if let Some(initial) = self.initial.take() {
            self.updater.update(initial, now);
        }

        let Some(rx) = self.pending.take() else {
            return;
        };
        match rx.try_recv() {
            Ok((feature, result)) => {
                if feature != self.feature {
                    return;
                }
                match result {
                    Ok(groups) => {
                        self.last_error = None;
                        self.updater.update(groups, now);
                    }
                    Err(error) => {
                        let message = format!("{error:#}");
                        warn!(feature = %feature, error = %message, "violin feature unavailable");
                        self.last_error = Some(message);
                    }
                }
            }
            Err(TryRecvError::Empty) => self.pending = Some(rx),
            Err(TryRecvError::Disconnected) => {
                self.last_error = Some("violin loader disconnected".to_owned());
            }
        }
    }

    pub(super) fn draw(&mut self, ui: &mut Ui, now: f64) {
        if let Dataset::Unavailable(reason) = &self.catalog {
            let reason = reason.clone();
            ui.vertical_centered(|ui| {
                ui.add_space(80.0);
                ui.heading("Violin data unavailable");
                ui.label(reason);
            });
            return;
        }

        let (rect, _response) = ui.allocate_exact_size(ui.available_size(), Sense::hover());
        let painter = ui.painter_at(rect);
        painter.rect_filled(rect, 0.0, Color32::from_rgb(250, 250, 248));

        let plot = Rect::from_min_max(
            rect.min + vec2(MARGIN * 1.5, MARGIN / 2.0),
            rect.max - vec2(MARGIN / 2.0, MARGIN * 1.25),
        );
        self.updater.resize(plot.size(), now);
        self.poll(now);
        self.updater.prune(now);

        let stroke_color = self.config.stroke;
        for violin in self.updater.violins() {
            let shape = violin.shape(now);
            if shape.profile.is_empty() {
                continue;
            }
            painter.add(Shape::mesh(violin_mesh(
                &shape.profile,
                plot.min.x + shape.center,
                plot.min.y,
                self.config.fill.with_opacity(shape.opacity),
            )));
            outline_polygon(
                &painter,
                shape.outline(plot.min),
                Stroke::new(1.0, stroke_color.with_opacity(shape.opacity)),
            );

            if !violin.is_exiting() {
                painter.text(
                    pos2(plot.min.x + shape.center, plot.bottom() + 6.0),
                    Align2::CENTER_TOP,
                    &violin.group,
                    FontId::proportional(11.0),
                    Color32::from_gray(60),
                );
            }
        }

        let axis = Stroke::new(1.0, Color32::from_gray(60));
        painter.line_segment([plot.left_bottom(), plot.right_bottom()], axis);
        painter.line_segment([plot.left_bottom(), plot.left_top()], axis);
        if let Some(value_axis) = self.updater.axis() {
            for value in [value_axis.domain.0, value_axis.domain.1] {
                painter.text(
                    pos2(plot.left() - 4.0, plot.top() + value_axis.y(value)),
                    Align2::RIGHT_CENTER,
                    format!("{value:.0}"),
                    FontId::proportional(11.0),
                    Color32::from_gray(60),
                );
            }
        }

        if self.updater.is_animating(now) || self.pending.is_some() {
            ui.ctx().request_repaint();
        }
    }
}

fn violin_mesh(profile: &[[f32; 2]], center: f32, top: f32, color: Color32) -> Mesh {
    let mut mesh = Mesh::default();
    for &[y, half] in profile {
        mesh.colored_vertex(pos2(center - half, top + y), color);
        mesh.colored_vertex(pos2(center + half, top + y), color);
    }
    for index in 1..profile.len() as u32 {
        let (a, b) = (2 * index - 2, 2 * index - 1);
        let (c, d) = (2 * index, 2 * index + 1);
        mesh.add_triangle(a, b, c);
        mesh.add_triangle(b, d, c);
    }
    mesh
}
