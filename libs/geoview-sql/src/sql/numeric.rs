// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Conversion between decimal strings and the PostgreSQL binary `numeric` representation.
//!
//! The wire format is: `ndigits: i16`, `weight: i16`, `sign: u16`, `dscale: u16`, followed by
//! `ndigits` base-10000 digits (each an `i16`). `weight` is the power of 10000 of the first digit.

use bytes::{Buf, BufMut, BytesMut};
use thiserror::Error;

const SIGN_POSITIVE: u16 = 0x0000;
const SIGN_NEGATIVE: u16 = 0x4000;
const SIGN_NAN: u16 = 0xC000;

#[derive(Debug, Error, PartialEq)]
pub enum NumericError {
    #[error("'{0}' is not a decimal number")]
    InvalidDecimal(String),
    #[error("Truncated numeric value")]
    Truncated,
}

pub(crate) fn encode_numeric(text: &str, out: &mut BytesMut) -> Result<(), NumericError> {
    let text = text.trim();

    if text.eq_ignore_ascii_case("nan") {
        out.put_i16(0);
        out.put_i16(0);
        out.put_u16(SIGN_NAN);
        out.put_u16(0);
        return Ok(());
    }

    let (negative, unsigned) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };

    let (int_part, frac_part) = unsigned.split_once('.').unwrap_or((unsigned, ""));

    let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if (int_part.is_empty() && frac_part.is_empty()) || !all_digits(int_part) || !all_digits(frac_part)
    {
        return Err(NumericError::InvalidDecimal(text.to_string()));
    }

    let int_part = int_part.trim_start_matches('0');
    let dscale = frac_part.len();

    let int_padding = (4 - int_part.len() % 4) % 4;
    let frac_padding = (4 - frac_part.len() % 4) % 4;
    let padded: String = std::iter::repeat_n('0', int_padding)
        .chain(int_part.chars())
        .chain(frac_part.chars())
        .chain(std::iter::repeat_n('0', frac_padding))
        .collect();

    let mut digits: Vec<i16> = padded
        .as_bytes()
        .chunks(4)
        .map(|chunk| {
            chunk
                .iter()
                .fold(0i16, |acc, b| acc * 10 + i16::from(b - b'0'))
        })
        .collect();

    let mut weight = ((int_padding + int_part.len()) / 4) as i16 - 1;

    while digits.first() == Some(&0) {
        digits.remove(0);
        weight -= 1;
    }
    while digits.last() == Some(&0) {
        digits.pop();
    }
    if digits.is_empty() {
        weight = 0;
    }

    out.put_i16(digits.len() as i16);
    out.put_i16(weight);
    out.put_u16(if negative && !digits.is_empty() {
        SIGN_NEGATIVE
    } else {
        SIGN_POSITIVE
    });
    out.put_u16(dscale as u16);
    for digit in digits {
        out.put_i16(digit);
    }

    Ok(())
}

pub(crate) fn decode_numeric(mut raw: &[u8]) -> Result<String, NumericError> {
    if raw.len() < 8 {
        return Err(NumericError::Truncated);
    }

    let ndigits = raw.get_i16();
    let weight = raw.get_i16();
    let sign = raw.get_u16();
    let dscale = raw.get_u16() as usize;

    if sign == SIGN_NAN {
        return Ok("NaN".to_string());
    }
    if raw.len() < ndigits.max(0) as usize * 2 {
        return Err(NumericError::Truncated);
    }
    let digits: Vec<i16> = (0..ndigits).map(|_| raw.get_i16()).collect();
    let digit_at = |index: i32| -> i16 {
        if index < 0 || index >= digits.len() as i32 {
            0
        } else {
            digits[index as usize]
        }
    };

    let mut result = String::new();
    if sign == SIGN_NEGATIVE {
        result.push('-');
    }

    if weight < 0 {
        result.push('0');
    } else {
        for index in 0..=i32::from(weight) {
            if index == 0 {
                result.push_str(&digit_at(index).to_string());
            } else {
                result.push_str(&format!("{:04}", digit_at(index)));
            }
        }
    }

    if dscale > 0 {
        let mut fraction = String::new();
        let mut index = i32::from(weight) + 1;
        while fraction.len() < dscale {
            fraction.push_str(&format!("{:04}", digit_at(index)));
            index += 1;
        }
        fraction.truncate(dscale);
        result.push('.');
        result.push_str(&fraction);
    }

    Ok(result)
}
