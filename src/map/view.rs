// src/map/view.rs
use crate::coords::Coordinate;
use crate::html::html_escape;
use crate::location_client::{LocationInfo, LookupError, DESCRIPTION_NOT_RECEIVED};
use crate::markdown::MarkdownRenderer;

pub const DEFAULT_CENTER: Coordinate = Coordinate::new(20.0, 0.0);
pub const DEFAULT_ZOOM: u8 = 2;
pub const LOCATED_ZOOM: u8 = 13;

pub const FETCHING_POPUP: &str = "Fetching data from the AI...";
pub const LOADING_HTML: &str = r#"<p class="text-secondary">Loading information...</p>"#;
pub const AI_UNAVAILABLE_HTML: &str =
    r#"<div class="alert alert-warning">AI service unavailable.</div>"#;
pub const NETWORK_ERROR_HTML: &str = r#"<div class="alert alert-danger">Could not retrieve information. Check the console for details.</div>"#;

/// Hidden values of the "like this place" form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LikePlaceForm {
    pub latitude: String,
    pub longitude: String,
    pub city_name: String,
}

impl LikePlaceForm {
    /// Uses the search label as the place name when there is one.
    pub fn for_location(at: Coordinate, label: Option<&str>) -> Self {
        let (latitude, longitude) = at.fixed();
        let city_name = match label.map(str::trim).filter(|l| !l.is_empty()) {
            Some(label) => label.to_string(),
            None => format!("Place at ({}, {})", latitude, longitude),
        };
        Self {
            latitude,
            longitude,
            city_name,
        }
    }
}

/// The map widget, its popup and the info modal.
pub trait MapView: Send {
    fn set_view(&mut self, center: Coordinate, zoom: u8);
    fn open_popup(&mut self, at: Coordinate, text: &str);
    fn close_popup(&mut self);
    fn set_modal_content(&mut self, html: &str);
    fn open_modal(&mut self);
    fn close_modal(&mut self);
    fn has_like_section(&self) -> bool;
    /// `None` hides the section.
    fn show_like_section(&mut self, form: Option<&LikePlaceForm>);
}

pub fn render_location_html(info: &LocationInfo, renderer: &dyn MarkdownRenderer) -> String {
    let address = format!(
        r#"<div class="mb-2"><strong>Address (OSM):</strong> {}</div>"#,
        html_escape(info.address_or_placeholder())
    );
    let description = match &info.description {
        Some(text) => format!(
            r#"<div><strong>Description:</strong><div class="mt-2">{}</div></div>"#,
            renderer.to_safe_html(text)
        ),
        None => format!(r#"<div class="text-secondary">{}.</div>"#, DESCRIPTION_NOT_RECEIVED),
    };
    address + &description
}

pub fn render_lookup_error_html(error: &LookupError) -> String {
    match error {
        LookupError::Rejected(message) => format!(
            r#"<div class="alert alert-danger"><strong>Error:</strong> {}</div>"#,
            html_escape(message)
        ),
        LookupError::Network(_) => NETWORK_ERROR_HTML.to_string(),
    }
}
