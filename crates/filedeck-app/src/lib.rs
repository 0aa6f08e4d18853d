// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

pub mod model;
pub mod rows;
pub mod view;

pub use model::*;
pub use rows::*;
pub use view::*;
