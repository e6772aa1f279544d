// SPDX-License-Identifier: GPL-3.0-only
pub mod clients;
pub mod interface;
pub mod lifecycle;
pub mod reload;

pub use clients::{ClientAddonCache, ClientJoin};
pub use interface::{AddonManagerInterface, MultiAddonManagerApi};
pub use lifecycle::{AddonLifecycleManager, AddonStatus, LifecycleState, ManagerSettings};
pub use reload::{Engine, MapTarget, ReloadCommand};
