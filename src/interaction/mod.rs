pub mod barplot;
pub mod category;
pub mod color;
pub mod histogram;
pub mod network;
pub mod sankey;
pub mod scale;
pub mod transition;
pub mod violin;
pub mod zone;

/// Values a hover or focus hands to the auxiliary bar plot, with the bar
/// that should be emphasised.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SelectionContext {
    pub values: Vec<(String, f64)>,
    pub selected: Option<String>,
}

impl SelectionContext {
    pub fn new(values: Vec<(String, f64)>, selected: Option<String>) -> Self {
        Self { values, selected }
    }
}
