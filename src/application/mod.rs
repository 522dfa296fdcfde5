pub mod anomaly;
pub mod features;
pub mod forecast;
pub mod pipeline;
pub mod recommend;
