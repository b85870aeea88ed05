//! # IFC Estimator
//!
//! Structural cost estimation from IFC files: quantity take-off, price
//! catalogue matching and bill of quantities.
//!
//! ## Features
//!
//! - Parse IFC files and extract beams, columns, members, slabs, walls,
//!   footings, piles and plates with their quantities and extrusion profiles
//! - Match elements to a CSV price catalogue by IFC class and name similarity
//! - Record cost schedules, items and element links in the model, idempotently
//! - Report quantity take-off and bill of quantities as text, JSON and CSV
//! - Write the annotated model back as a new IFC file
//!
//! ## Example
//!
//! ```no_run
//! use ifc_estimator::catalogue::load_catalogue;
//! use ifc_estimator::config::EstimateConfig;
//! use ifc_estimator::parser::parse_ifc_file;
//!
//! let config = EstimateConfig::default();
//! let mut model = parse_ifc_file("frame.ifc").expect("Failed to parse");
//! let rows = load_catalogue("prices.csv", &config.columns, &config.csv).expect("Failed to read");
//!
//! let summary = model.assign_costs(&rows, &config.schedule_name);
//! println!("Assigned: {}", summary.assigned);
//!
//! let bill = model.bill_of_quantities(config.group_by_level, config.unavailable);
//! println!("Total: {:.2}", bill.grand_total);
//! ```

pub mod assign;
pub mod catalogue;
pub mod config;
pub mod error;
pub mod export;
pub mod model;
pub mod parser;
pub mod quantity;
pub mod report;
pub mod units;
