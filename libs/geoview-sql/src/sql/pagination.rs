// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use super::{ExpressionBuilder, SqlBuilder};

/// `LIMIT n`.
///
/// Unlike condition values, limits are rendered as literals: they come from the definition rather
/// than from free text, and the validator needs to see the bound to decide whether to inject one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limit(pub u64);

/// `OFFSET n`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Offset(pub u64);

impl ExpressionBuilder for Limit {
    fn build(&self, builder: &mut SqlBuilder) {
        builder.push_str("LIMIT ");
        builder.push_str(self.0.to_string());
    }
}

impl ExpressionBuilder for Offset {
    fn build(&self, builder: &mut SqlBuilder) {
        builder.push_str("OFFSET ");
        builder.push_str(self.0.to_string());
    }
}
