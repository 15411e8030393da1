//! Stream decoding for the structures the parser must look inside.
//!
//! Only cross-reference streams and object streams are ever decoded; page
//! content is copied as stored. FlateDecode with PNG predictors covers what
//! writers emit for those two stream types in practice.

use std::io::Read;

use flate2::read::ZlibDecoder;
use log::warn;

use crate::error::{PdfSpliceError, Result};
use crate::object::{Dictionary, Object, Stream};

/// Decode the payload of `stream` through its whole filter chain.
///
/// No stage may produce more than `max_bytes`; past that the stream fails
/// with [`PdfSpliceError::PageLimitExceeded`].
pub(crate) fn decode_stream(stream: &Stream, max_bytes: usize) -> Result<Vec<u8>> {
    let filters = stream.filters();
    let params = decode_params(&stream.dict, filters.len());
    let mut data = stream.content.clone();

    for (filter, params) in filters.into_iter().zip(params) {
        data = match filter {
            b"FlateDecode" | b"Fl" => {
                let inflated = inflate(&data, max_bytes)?;
                apply_predictor(inflated, params)?
            }
            other => {
                return Err(PdfSpliceError::unsupported(format!(
                    "stream filter /{}",
                    String::from_utf8_lossy(other)
                )));
            }
        };
    }
    Ok(data)
}

/// `/DecodeParms` entries aligned with the filter list.
fn decode_params(dict: &Dictionary, count: usize) -> Vec<Option<&Dictionary>> {
    match dict.get(b"DecodeParms") {
        Some(Object::Dictionary(params)) => {
            let mut out = vec![None; count];
            if let Some(first) = out.first_mut() {
                *first = Some(params);
            }
            out
        }
        Some(Object::Array(items)) => (0..count)
            .map(|i| items.get(i).and_then(Object::as_dict))
            .collect(),
        _ => vec![None; count],
    }
}

fn inflate(data: &[u8], max_bytes: usize) -> Result<Vec<u8>> {
    let mut output = Vec::new();
    // One byte past the ceiling tells "exactly at the limit" from "over it".
    let ceiling = u64::try_from(max_bytes).unwrap_or(u64::MAX).saturating_add(1);
    let result = ZlibDecoder::new(data).take(ceiling).read_to_end(&mut output);
    if output.len() > max_bytes {
        return Err(PdfSpliceError::PageLimitExceeded {
            what: "bytes",
            limit: max_bytes,
            requested: output.len(),
        });
    }
    match result {
        Ok(_) => Ok(output),
        // A damaged tail still leaves a usable prefix.
        Err(err) if !output.is_empty() => {
            warn!(
                "FlateDecode recovered {} bytes before corruption: {err}",
                output.len()
            );
            Ok(output)
        }
        Err(err) => Err(PdfSpliceError::malformed(
            0,
            format!("FlateDecode failed: {err}"),
        )),
    }
}

fn param(params: &Dictionary, key: &[u8], default: usize) -> usize {
    params
        .get(key)
        .and_then(Object::as_i64)
        .and_then(|value| usize::try_from(value).ok())
        .unwrap_or(default)
}

fn apply_predictor(data: Vec<u8>, params: Option<&Dictionary>) -> Result<Vec<u8>> {
    let Some(params) = params else {
        return Ok(data);
    };
    let predictor = param(params, b"Predictor", 1);
    if predictor == 1 {
        return Ok(data);
    }
    if predictor < 10 {
        return Err(PdfSpliceError::unsupported(format!(
            "predictor {predictor}"
        )));
    }

    let colors = param(params, b"Colors", 1).max(1);
    let bits = param(params, b"BitsPerComponent", 8).max(1);
    let columns = param(params, b"Columns", 1).max(1);
    let invalid = || {
        PdfSpliceError::malformed(
            0,
            format!("predictor row of {columns} x {colors} x {bits} bits is out of range"),
        )
    };
    let pixel_bits = colors.checked_mul(bits).ok_or_else(invalid)?;
    let row_bits = pixel_bits.checked_mul(columns).ok_or_else(invalid)?;
    let bpp = pixel_bits.div_ceil(8).max(1);
    let row_len = row_bits.div_ceil(8);
    if row_len > data.len() {
        return Err(invalid());
    }

    decode_png_rows(&data, row_len, bpp)
}

/// Undo PNG row filtering; every row starts with its own filter tag.
fn decode_png_rows(data: &[u8], row_len: usize, bpp: usize) -> Result<Vec<u8>> {
    let stride = row_len + 1;
    let mut output = Vec::with_capacity(data.len() / stride * row_len);
    let mut previous = vec![0u8; row_len];

    for chunk in data.chunks(stride) {
        if chunk.len() < stride {
            // Trailing partial row, usually padding.
            break;
        }
        let tag = chunk[0];
        let mut row = chunk[1..].to_vec();
        for i in 0..row_len {
            let left = if i >= bpp { row[i - bpp] } else { 0 };
            let up = previous[i];
            let up_left = if i >= bpp { previous[i - bpp] } else { 0 };
            let predicted = match tag {
                0 => 0,
                1 => left,
                2 => up,
                3 => ((u16::from(left) + u16::from(up)) / 2) as u8,
                4 => paeth(left, up, up_left),
                other => {
                    return Err(PdfSpliceError::malformed(
                        0,
                        format!("invalid PNG predictor tag {other}"),
                    ));
                }
            };
            row[i] = row[i].wrapping_add(predicted);
        }
        output.extend_from_slice(&row);
        previous = row;
    }
    Ok(output)
}

fn paeth(left: u8, up: u8, up_left: u8) -> u8 {
    let estimate = i16::from(left) + i16::from(up) - i16::from(up_left);
    let distance_left = (estimate - i16::from(left)).abs();
    let distance_up = (estimate - i16::from(up)).abs();
    let distance_up_left = (estimate - i16::from(up_left)).abs();
    if distance_left <= distance_up && distance_left <= distance_up_left {
        left
    } else if distance_up <= distance_up_left {
        up
    } else {
        up_left
    }
}
