//! Flow classification: direction and frequency normalization, dash styling
//! and the data traffic filter.

mod compositor;
mod geometry;
mod legend;

pub(in crate::app) use compositor::{
    FlowCompositor, FlowInputs, RenderFlow, TaggedFlow, active_edge_ids, flows_by_edge,
};
pub(in crate::app) use geometry::{FlowLayoutConfig, FlowLineDir};
pub(in crate::app) use legend::{
    LegendItem, UNCATEGORIZED_ID, build_legend, category_name, visible_category_ids,
};

use crate::model::Flow;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowDir {
    Forward,
    Reverse,
    Both,
}

impl FlowDir {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Forward => "forward",
            Self::Reverse => "reverse",
            Self::Both => "both",
        }
    }
}

/// Maps the many direction spellings found in the data model onto
/// forward/reverse/both. Anything unrecognized is forward.
pub fn normalize_flow_dir(raw: Option<&str>) -> FlowDir {
    let Some(raw) = raw else {
        return FlowDir::Forward;
    };

    let normalized = raw.trim().to_lowercase();
    match normalized.as_str() {
        "source_to_target" | "source-to-target" | "forward" | "outgoing" | "utgående"
        | "from_to" | "from-to" | "from>to" | "from->to" | "källa->mål" | "kalla->mal" => {
            FlowDir::Forward
        }
        "target_to_source" | "target-to-source" | "reverse" | "incoming" | "inkommande"
        | "to_from" | "to-from" | "to>from" | "to->from" | "mål->källa" | "mal->kalla" => {
            FlowDir::Reverse
        }
        "bidirectional" | "both" | "bi" | "bidir" | "dubbelriktad" | "double" | "dual" => {
            FlowDir::Both
        }
        _ => FlowDir::Forward,
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowFreqClass {
    Continuous,
    Periodic,
    Batch,
    Unknown,
}

impl FlowFreqClass {
    pub fn label(self) -> &'static str {
        match self {
            Self::Continuous => "continuous",
            Self::Periodic => "periodic",
            Self::Batch => "batch",
            Self::Unknown => "unknown",
        }
    }

    /// Seconds for one full dash travel cycle.
    pub fn animation_period_secs(self) -> f32 {
        match self {
            Self::Continuous => 1.05,
            Self::Periodic => 1.55,
            Self::Batch => 2.05,
            Self::Unknown => 1.75,
        }
    }

    pub fn dash_pattern(self) -> DashPattern {
        DashPattern::FLOW
    }
}

pub fn normalize_frequency_class(raw: Option<&str>) -> FlowFreqClass {
    let normalized = raw.unwrap_or_default().trim().to_lowercase();
    if normalized.is_empty() {
        return FlowFreqClass::Unknown;
    }

    match normalized.as_str() {
        "continuous" | "realtime" | "real_time" | "stream" | "streaming" | "event"
        | "event_driven" | "near_realtime" | "near-real-time" => {
            return FlowFreqClass::Continuous;
        }
        _ => {}
    }

    if normalized.contains("batch") || normalized.contains("nightly") {
        return FlowFreqClass::Batch;
    }

    const PERIODIC_EXACT: [&str; 6] = ["periodic", "scheduled", "hourly", "daily", "weekly", "monthly"];
    const PERIODIC_FRAGMENTS: [&str; 6] = ["hour", "day", "week", "month", "cron", "schedule"];
    if PERIODIC_EXACT.contains(&normalized.as_str())
        || PERIODIC_FRAGMENTS
            .iter()
            .any(|fragment| normalized.contains(fragment))
    {
        return FlowFreqClass::Periodic;
    }

    FlowFreqClass::Unknown
}

/// On/off dash lengths in world units.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DashPattern {
    pub dash: f32,
    pub gap: f32,
}

impl DashPattern {
    pub const FLOW: Self = Self { dash: 8.0, gap: 6.0 };

    pub fn cycle_length(self) -> f32 {
        (self.dash.max(0.0)) + (self.gap.max(0.0))
    }

    pub fn half_cycle(self) -> f32 {
        self.cycle_length() / 2.0
    }
}

/// Distance the dash phase travels per animation period.
pub const DASH_TRAVEL_PER_PERIOD: f32 = 56.0;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum FlowDirectionFilter {
    #[default]
    All,
    Outgoing,
    Incoming,
}

impl FlowDirectionFilter {
    pub fn label(self) -> &'static str {
        match self {
            Self::All => "All directions",
            Self::Outgoing => "Outgoing",
            Self::Incoming => "Incoming",
        }
    }
}

/// The data traffic filter applied to flow overlays.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct FlowFilter {
    pub enabled: bool,
    pub show_proposals: bool,
    pub direction: FlowDirectionFilter,
    pub data_category_id: Option<String>,
    pub flow_type: Option<String>,
}

impl FlowFilter {
    pub fn keeps(&self, flow: &Flow) -> bool {
        if !self.enabled {
            return true;
        }

        if let Some(flow_type) = &self.flow_type
            && &flow.flow_type != flow_type
        {
            return false;
        }

        if let Some(category) = &self.data_category_id
            && flow.data_category_id.as_ref() != Some(category)
        {
            return false;
        }

        let dir = normalize_flow_dir(flow.direction.as_deref());
        match self.direction {
            FlowDirectionFilter::All => true,
            FlowDirectionFilter::Outgoing => matches!(dir, FlowDir::Forward | FlowDir::Both),
            FlowDirectionFilter::Incoming => matches!(dir, FlowDir::Reverse | FlowDir::Both),
        }
    }
}
