//! Tenant Management Core
//!
//! Resource model and synthesis engine: stacks of declarative resources are
//! resolved, tagged, validated and rendered into CloudFormation templates.
//! Synthesis never calls a cloud API.

pub mod app;
pub mod assembly;
pub mod cidr;
pub mod graph;
pub mod provider;
pub mod resource;
pub mod schema;
pub mod stack;
pub mod template;
