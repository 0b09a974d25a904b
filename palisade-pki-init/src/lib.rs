//! PKI bootstrap for the Palisade platform
//!
//! Provisions the root CA plus per-service TLS material for the secrets
//! store and the API gateway, and governs how that material moves from a
//! one-shot generator, through an at-most-once-populated cache, into the
//! runtime secrets directory the platform reads. The filesystem is the
//! only cross-run state.
// Copyright 2025 Francisco F. Pinochet
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.


pub mod cache;
pub mod command;
pub mod deploy;
pub mod descriptor;
pub mod error;
pub mod fsutil;
pub mod generator;
pub mod layout;
pub mod rearrange;
pub mod shred;
pub mod workdir;

pub use command::PkiInit;
pub use error::{PkiError, PkiResult};
pub use generator::{CertificateGenerator, RcgenGenerator};
pub use layout::{PkiBundle, ServiceIdentity};
