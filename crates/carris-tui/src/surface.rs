//! Terminal map surface: braille canvas with one dot + label per marker.
//!
//! Plain lon/lat projection; at city scale the distortion is not visible at
//! terminal resolution.

use std::collections::BTreeMap;

use carris_proto::model::{Bounds, GeoPoint};
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    symbols,
    text::Span,
    widgets::{
        canvas::{Canvas, Points},
        Block,
    },
    Frame,
};

use crate::overlay::{MapSurface, Marker, MarkerId, SurfaceError, Viewpoint};
use crate::theme::C_MAP_GRID;

/// Smallest pane the map is drawn into.
pub const MIN_WIDTH: u16 = 12;
pub const MIN_HEIGHT: u16 = 5;

/// Degrees of longitude visible at zoom 0 across the pane.
const WORLD_LON_SPAN: f64 = 1440.0;
/// A fitted view never gets narrower than this (degrees), so one bus does
/// not zoom in to street level.
const MIN_FIT_SPAN: f64 = 0.01;

#[derive(Debug, Clone)]
pub struct CanvasSurface {
    width: u16,
    height: u16,
    viewport: Bounds,
    /// Last viewpoint set, until a fit replaces it.
    view: Option<Viewpoint>,
    markers: BTreeMap<MarkerId, Marker>,
    next_id: MarkerId,
}

impl CanvasSurface {
    /// Build a surface for a pane of `area`'s size.
    pub fn mount(area: Rect) -> Result<Self, SurfaceError> {
        if area.width < MIN_WIDTH || area.height < MIN_HEIGHT {
            return Err(SurfaceError::TooSmall {
                width: area.width,
                height: area.height,
            });
        }
        let origin = GeoPoint { lat: 0.0, lon: 0.0 };
        Ok(Self {
            width: area.width,
            height: area.height,
            viewport: Bounds::around(origin, 180.0, 360.0),
            view: None,
            markers: BTreeMap::new(),
            next_id: 0,
        })
    }

    /// Follow the pane to its new size. Sizes below the mount minimum are
    /// ignored. Returns `true` when the size changed.
    pub fn resize(&mut self, area: Rect) -> bool {
        if area.width < MIN_WIDTH || area.height < MIN_HEIGHT {
            return false;
        }
        if (area.width, area.height) == (self.width, self.height) {
            return false;
        }
        self.width = area.width;
        self.height = area.height;
        if let Some(view) = self.view {
            self.set_view(view);
        }
        true
    }

    pub fn viewport(&self) -> Bounds {
        self.viewport
    }

    pub fn markers(&self) -> impl Iterator<Item = &Marker> {
        self.markers.values()
    }

    /// Terminal cells are about twice as tall as wide; braille packs 2x4 dots.
    fn aspect(&self) -> f64 {
        (self.height as f64 * 2.0) / self.width as f64
    }

    pub fn draw(&self, frame: &mut Frame, area: Rect, block: Block) {
        let Bounds {
            south,
            west,
            north,
            east,
        } = self.viewport();

        let canvas = Canvas::default()
            .block(block)
            .marker(symbols::Marker::Braille)
            .x_bounds([west, east])
            .y_bounds([south, north])
            .paint(|ctx| {
                // Crosshair on the viewport center.
                let center = self.viewport.center();
                ctx.draw(&Points {
                    coords: &[(center.lon, center.lat)],
                    color: C_MAP_GRID,
                });
                ctx.layer();

                for marker in self.markers() {
                    let color = Color::Rgb(marker.color.r, marker.color.g, marker.color.b);
                    let (x, y) = (marker.position.lon, marker.position.lat);
                    ctx.draw(&Points {
                        coords: &[(x, y)],
                        color,
                    });
                    ctx.print(
                        x,
                        y,
                        Span::styled(
                            marker.label.clone(),
                            Style::default().fg(color).add_modifier(Modifier::BOLD),
                        ),
                    );
                }
            });
        frame.render_widget(canvas, area);
    }
}

impl MapSurface for CanvasSurface {
    fn set_view(&mut self, view: Viewpoint) {
        let lon_span = WORLD_LON_SPAN / 2f64.powi(i32::from(view.zoom));
        let lat_span = lon_span * view.center.lat.to_radians().cos() * self.aspect();
        self.viewport = Bounds::around(view.center, lat_span, lon_span);
        self.view = Some(view);
    }

    fn add_marker(&mut self, marker: Marker) -> MarkerId {
        self.next_id += 1;
        self.markers.insert(self.next_id, marker);
        self.next_id
    }

    fn remove_marker(&mut self, id: MarkerId) {
        self.markers.remove(&id);
    }

    fn fit_bounds(&mut self, bounds: Bounds, padding: f64) {
        self.viewport = bounds.padded(padding, MIN_FIT_SPAN);
        self.view = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use carris_proto::model::LineColor;

    fn marker(lat: f64, lon: f64) -> Marker {
        Marker {
            position: GeoPoint { lat, lon },
            label: "1523".to_string(),
            color: LineColor::rgb(0xEB, 0xBD, 0x02),
        }
    }

    #[test]
    fn test_mount_rejects_tiny_pane() {
        assert!(matches!(
            CanvasSurface::mount(Rect::new(0, 0, 0, 0)),
            Err(SurfaceError::TooSmall { .. })
        ));
        assert!(CanvasSurface::mount(Rect::new(0, 0, 40, 12)).is_ok());
    }

    #[test]
    fn test_set_view_centers_on_viewpoint() {
        let mut surface = CanvasSurface::mount(Rect::new(0, 0, 40, 20)).unwrap();
        let center = GeoPoint {
            lat: 38.7223,
            lon: -9.1393,
        };
        surface.set_view(Viewpoint { center, zoom: 12 });
        let vp = surface.viewport();
        assert!((vp.center().lat - center.lat).abs() < 1e-9);
        assert!((vp.center().lon - center.lon).abs() < 1e-9);
        assert!(vp.east - vp.west < 1.0);

        surface.set_view(Viewpoint { center, zoom: 13 });
        let closer = surface.viewport();
        assert!(closer.east - closer.west < vp.east - vp.west);
    }

    #[test]
    fn test_resize_reapplies_view_with_new_aspect() {
        let mut surface = CanvasSurface::mount(Rect::new(0, 0, 40, 20)).unwrap();
        let center = GeoPoint {
            lat: 38.7223,
            lon: -9.1393,
        };
        surface.set_view(Viewpoint { center, zoom: 12 });
        let before = surface.viewport();

        assert!(surface.resize(Rect::new(0, 0, 80, 20)));
        let after = surface.viewport();
        assert!((after.east - after.west - (before.east - before.west)).abs() < 1e-9);
        assert!(after.north - after.south < before.north - before.south);

        assert!(!surface.resize(Rect::new(0, 0, 80, 20)));
        assert!(!surface.resize(Rect::new(0, 0, 4, 2)));
    }

    #[test]
    fn test_resize_keeps_fitted_viewport() {
        let mut surface = CanvasSurface::mount(Rect::new(0, 0, 40, 20)).unwrap();
        surface.add_marker(marker(38.70, -9.30));
        surface.add_marker(marker(38.80, -9.10));
        let covering = Bounds::covering(surface.markers().map(|m| m.position)).unwrap();
        surface.fit_bounds(covering, 0.1);
        let fitted = surface.viewport();

        assert!(surface.resize(Rect::new(0, 0, 60, 30)));
        assert_eq!(surface.viewport(), fitted);
    }

    #[test]
    fn test_fit_bounds_keeps_every_marker_visible() {
        let mut surface = CanvasSurface::mount(Rect::new(0, 0, 40, 20)).unwrap();
        let a = surface.add_marker(marker(38.70, -9.30));
        surface.add_marker(marker(38.80, -9.10));
        let covering = Bounds::covering(surface.markers().map(|m| m.position)).unwrap();
        surface.fit_bounds(covering, 0.1);

        let vp = surface.viewport();
        assert!(surface.markers().all(|m| vp.contains(m.position)));
        assert!(vp.south < 38.70 && vp.north > 38.80);

        surface.remove_marker(a);
        assert_eq!(surface.markers().count(), 1);
    }
}
