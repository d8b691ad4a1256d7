// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Saved query definitions.

mod error;
mod file;
mod memory;
mod store;
mod stored_query;

pub use error::StoreError;
pub use file::FileQueryStore;
pub use memory::MemoryQueryStore;
pub use store::QueryStore;
pub use stored_query::{QueryKey, StoredQuery};
