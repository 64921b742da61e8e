pub mod clean;
pub mod combine;
pub mod config;
pub mod diagnostics;
pub mod events;
pub mod export;
pub mod fixtures;
pub mod ingest;
pub mod model;
pub mod region;
pub mod scale;
pub mod segment;
pub mod select;
pub mod stats;
pub mod time;

pub use clean::{Cleaner, Deglitcher};
pub use combine::{Combiner, binary_decode, binary_encode, combine_tracks};
pub use config::{CaptureConfig, DiagnosticsConfig, ExportConfig, SeglaneConfig};
pub use diagnostics::{TelemetryGuard, init_tracing};
pub use events::{Event, as_events, segments_from_samples};
pub use export::{VcdOptions, VcdSignal, VcdTrack, export_vcd, vcd_bytes, write_vcd};
pub use ingest::{
    ChannelSpec, ValueChange, binary_tracks_from_value_changes, segments_from_value_changes,
    validate_channels,
};
pub use model::{
    BinaryTrack, ContinuousTrack, FloatTrack, Track, TrackInfo, UnsignedTrack, UnsignedVcdRepr,
    make_activity_track,
};
pub use region::RegionSelect;
pub use scale::DurationScaler;
pub use segment::{Segment, SegmentError, SegmentIterExt, SegmentStream, Substitute, Value};
pub use select::{
    Picker, Replacement, Replacer, Transition, always, mask_apply, never, tester,
    transition_split, value_remap,
};
pub use stats::{ModeReport, ModeRow, ModeSpec, ValueStats, basic_statistics, mode_report};
pub use time::ScaleFactor;
