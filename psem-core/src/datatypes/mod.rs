//! Data types shared by the table codec and the table engine

pub mod meter_time;
pub mod time_format;

pub use meter_time::MeterTime;
pub use time_format::TimeFormat;
