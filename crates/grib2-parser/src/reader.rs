//! Message-level reading of GRIB2 containers.

use bytes::Bytes;
use std::path::Path;
use tracing::debug;

use crate::sections::{
    self, Bitmap, DataRepresentation, DataSection, GridDefinition, Identification, Indicator,
    ProductDefinition, INDICATOR_LEN, SIMPLE_PACKING,
};
use crate::subset::{extract_subgrid, SubGrid};
use crate::unpacking::{count_present, unpack_simple, unpack_with_grib, MAX_GRID_POINTS};
use crate::{Grib2Error, Result};
use gfs_common::BoundingBox;

/// One fully parsed GRIB2 message.
#[derive(Debug, Clone)]
pub struct Grib2Message {
    pub indicator: Indicator,
    pub identification: Identification,
    pub grid_definition: GridDefinition,
    pub product_definition: ProductDefinition,
    pub data_representation: DataRepresentation,
    pub bitmap: Option<Bitmap>,
    pub data_section: DataSection,
    /// Bytes of the whole message, `GRIB` through `7777`.
    pub raw: Bytes,
}

impl Grib2Message {
    /// Parse all sections of a single message.
    pub fn parse(raw: Bytes) -> Result<Self> {
        let data = raw.as_ref();
        let indicator = sections::parse_indicator(data)?;
        let identification = sections::parse_identification(data)?;
        let grid_definition = sections::parse_grid_definition(data)?;
        let product_definition = sections::parse_product_definition(data, indicator.discipline)?;
        let data_representation = sections::parse_data_representation(data)?;
        let bitmap = sections::parse_bitmap(data)?;
        let data_section = sections::parse_data_section(data)?;
        Ok(Self {
            indicator,
            identification,
            grid_definition,
            product_definition,
            data_representation,
            bitmap,
            data_section,
            raw,
        })
    }

    /// Parameter short name (e.g. `HGT`).
    pub fn parameter(&self) -> &str {
        &self.product_definition.parameter_short_name
    }

    /// Grid dimensions as `(rows, columns)`.
    pub fn grid_dims(&self) -> (usize, usize) {
        (
            self.grid_definition.num_points_latitude as usize,
            self.grid_definition.num_points_longitude as usize,
        )
    }

    /// Check the grid size against Sections 5, 6 and 7.
    ///
    /// Every decode buffer is sized from Ni x Nj, so a header that disagrees
    /// with the data actually present is rejected before anything is allocated.
    pub fn check_layout(&self) -> Result<()> {
        let num_points = self.grid_definition.num_points();
        if num_points > MAX_GRID_POINTS {
            return Err(Grib2Error::InvalidFormat(format!(
                "Grid of {} points exceeds the limit of {}",
                num_points, MAX_GRID_POINTS
            )));
        }

        let present = match &self.bitmap {
            Some(bitmap) => count_present(&bitmap.data, num_points).ok_or_else(|| {
                Grib2Error::InvalidFormat(format!(
                    "Bitmap of {} bytes is too short for {} points",
                    bitmap.data.len(),
                    num_points
                ))
            })?,
            None => num_points,
        };

        let repr = &self.data_representation;
        if present != repr.num_data_points as usize {
            return Err(Grib2Error::InvalidFormat(format!(
                "Grid has {} points with values but Section 5 declares {}",
                present, repr.num_data_points
            )));
        }

        if repr.template == SIMPLE_PACKING {
            if repr.bits_per_value > 32 {
                return Err(Grib2Error::InvalidFormat(format!(
                    "Invalid bits per value: {}",
                    repr.bits_per_value
                )));
            }
            let needed_bits = present as u64 * repr.bits_per_value as u64;
            let available_bits = self.data_section.data.len() as u64 * 8;
            if needed_bits > available_bits {
                return Err(Grib2Error::InvalidFormat(format!(
                    "{} values of {} bits need {} bits, Section 7 holds {}",
                    present, repr.bits_per_value, needed_bits, available_bits
                )));
            }
        }
        Ok(())
    }

    /// Decode the data section into physical values, row-major in scan order.
    ///
    /// Points masked out by the bitmap become NaN.
    pub fn unpack_data(&self) -> Result<Vec<f32>> {
        self.check_layout()?;
        let repr = &self.data_representation;
        if repr.template != SIMPLE_PACKING {
            debug!(template = repr.template, "Unpacking through the grib crate");
            return unpack_with_grib(&self.raw, self.grid_definition.num_points());
        }

        let values = unpack_simple(
            &self.data_section.data,
            self.grid_definition.num_points(),
            repr.bits_per_value,
            repr.reference_value,
            repr.binary_scale_factor,
            repr.decimal_scale_factor,
            self.bitmap.as_ref().map(|b| b.data.as_ref()),
        )?;
        Ok(values.into_iter().map(|v| v.unwrap_or(f32::NAN)).collect())
    }

    /// Decode and cut the cells whose centres fall inside `bbox`.
    pub fn extract(&self, bbox: &BoundingBox) -> Result<SubGrid> {
        let values = self.unpack_data()?;
        extract_subgrid(&self.grid_definition, &values, bbox)
    }
}

/// Sequential reader over the messages of a GRIB2 container.
pub struct Grib2Reader {
    data: Bytes,
    offset: usize,
}

impl Grib2Reader {
    pub fn new(data: Bytes) -> Self {
        Self { data, offset: 0 }
    }

    /// Read a whole file into memory.
    pub fn open(path: &Path) -> Result<Self> {
        let data = std::fs::read(path)?;
        Ok(Self::new(Bytes::from(data)))
    }

    /// Parse the next message, or `None` at the end of the container.
    pub fn next_message(&mut self) -> Result<Option<Grib2Message>> {
        let Some(start) = find_magic(&self.data, self.offset) else {
            self.offset = self.data.len();
            return Ok(None);
        };

        let indicator = sections::parse_indicator(&self.data[start..])?;
        let length = usize::try_from(indicator.message_length).map_err(|_| {
            Grib2Error::InvalidFormat("Message length does not fit in memory".to_string())
        })?;

        let fits = start
            .checked_add(length)
            .is_some_and(|end| end <= self.data.len());
        if length < INDICATOR_LEN + 4 || !fits {
            return Err(Grib2Error::InvalidFormat(format!(
                "Truncated message at offset {}: declared {} bytes, {} available",
                start,
                length,
                self.data.len() - start
            )));
        }

        let message = self.data.slice(start..start + length);
        if &message[length - 4..] != b"7777" {
            return Err(Grib2Error::InvalidFormat(format!(
                "Message at offset {} is missing the 7777 end marker",
                start
            )));
        }

        self.offset = start + length;
        let parsed = Grib2Message::parse(message)?;
        debug!(
            offset = start,
            length = length,
            parameter = %parsed.parameter(),
            level = %parsed.product_definition.level_description,
            "Parsed GRIB2 message"
        );
        Ok(Some(parsed))
    }

    /// Parse every remaining message.
    pub fn messages(mut self) -> Result<Vec<Grib2Message>> {
        let mut messages = Vec::new();
        while let Some(message) = self.next_message()? {
            messages.push(message);
        }
        Ok(messages)
    }

    /// Return the only message in the container.
    ///
    /// Multi-message files are rejected instead of silently taking the first.
    pub fn single_message(self) -> Result<Grib2Message> {
        let mut messages = self.messages()?;
        match messages.len() {
            0 => Err(Grib2Error::NoMessages),
            1 => Ok(messages.remove(0)),
            n => Err(Grib2Error::MultipleMessages(n)),
        }
    }

    /// Return the message at `index` (0-based).
    pub fn message_at(self, index: usize) -> Result<Grib2Message> {
        let mut messages = self.messages()?;
        let count = messages.len();
        if count == 0 {
            return Err(Grib2Error::NoMessages);
        }
        if index >= count {
            return Err(Grib2Error::MessageIndexOutOfRange { index, count });
        }
        Ok(messages.swap_remove(index))
    }
}

fn find_magic(data: &[u8], from: usize) -> Option<usize> {
    if from >= data.len() {
        return None;
    }
    data[from..]
        .windows(4)
        .position(|w| w == b"GRIB")
        .map(|pos| from + pos)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_container() {
        let mut reader = Grib2Reader::new(Bytes::new());
        assert!(reader.next_message().unwrap().is_none());
        assert!(matches!(
            Grib2Reader::new(Bytes::new()).single_message(),
            Err(Grib2Error::NoMessages)
        ));
    }

    #[test]
    fn test_truncated_message() {
        let mut data = b"GRIB".to_vec();
        data.extend_from_slice(&[0, 0, 0, 2]);
        data.extend_from_slice(&1000u64.to_be_bytes());
        let mut reader = Grib2Reader::new(Bytes::from(data));
        assert!(matches!(
            reader.next_message(),
            Err(Grib2Error::InvalidFormat(_))
        ));
    }
}
