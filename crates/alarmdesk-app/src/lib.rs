// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

pub mod actions;
pub mod calendar;
pub mod ids;
pub mod model;
pub mod picker;
pub mod search;
pub mod state;

pub use actions::*;
pub use calendar::*;
pub use ids::*;
pub use model::*;
pub use picker::*;
pub use search::*;
pub use state::*;
