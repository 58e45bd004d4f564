// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright © 2026 framemap contributors

pub mod support {
    #[cfg(feature = "vaapi")] pub mod va;
    #[cfg(feature = "opencl")] pub mod cl;
    #[cfg(feature = "level-zero")] pub mod ze;
}

mod types;
mod tensor;
mod frame;
mod context;
mod mappers;
mod pool;
mod element;
pub use types::*;
pub use tensor::*;
pub use frame::*;
pub use context::*;
pub use mappers::*;
pub use pool::*;
pub use element::*;
