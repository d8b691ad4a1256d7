// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Query construction and safety validation for PostGIS-backed map layers.
//!
//! A [`QueryDefinition`] describes a read query structurally. [`compile`] turns it into a
//! [`CompiledStatement`]: SQL text with `$n` placeholders and the values bound to them. Every
//! statement, compiled or hand-written, then passes the [`Validator`], which accepts, rewrites (to
//! add a row limit) or rejects it. Only the resulting [`ValidatedStatement`] can be executed by the
//! [`QueryExecutor`] or handed to a view publisher. [`GeometryInference`] finds the geometry column
//! a map layer needs, statically from the catalog where possible.
//!
//! The lower level SQL building primitives are internal; [`SqlValue`] is the only one exposed,
//! since it is what gets bound to placeholders.
#[macro_use]
mod sql;

pub mod compiler;
pub mod config;
pub mod connect;
pub mod database_error;
pub mod env;
pub mod executor;
pub mod geometry;
pub mod query;
pub mod suggestion;
pub mod validator;

pub use compiler::{CompileError, CompiledStatement, OutputColumn, RelationRef, compile};
pub use executor::{ExecuteOptions, ExecutionError, QueryExecutor, ResultSet};
pub use geometry::{GeometryInference, GeometryMetadata, GeometryType, InferenceError};
pub use query::QueryDefinition;
pub use sql::{SqlValue, sanitize_identifier};
pub use validator::{ValidatedStatement, ValidationVerdict, Validator, ValidatorPolicy};
