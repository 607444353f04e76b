pub mod common;

mod cpa_provider_flows;
