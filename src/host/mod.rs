// SPDX-License-Identifier: GPL-3.0-only
pub mod console;
pub mod engine;
pub mod search_path;

pub use console::{ConsoleCommand, ConsoleError};
pub use engine::ConsoleEngine;
pub use search_path::LocalSearchPath;
