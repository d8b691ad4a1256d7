// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Console logging, filtered by `GEOVIEW_LOG` (same syntax as `RUST_LOG`). Logs go to stderr so
//! that command output on stdout stays machine-readable.

use tracing_subscriber::{EnvFilter, filter::LevelFilter, prelude::*};

const GEOVIEW_LOG: &str = "GEOVIEW_LOG";

pub fn init() {
    let fmt_layer = tracing_subscriber::fmt::layer()
        .compact()
        .with_writer(std::io::stderr);
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .with_env_var(GEOVIEW_LOG)
        .from_env_lossy();

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}
