use super::SampleFormat;

/// Mix `source` scaled by `volume` into `output`, sample by sample, in the
/// given format. Integer formats saturate at their range and float samples are
/// clamped to [-1.0, 1.0]. Only the common prefix of whole samples is touched.
pub fn mix_with_volume(source: &[u8], output: &mut [u8], format: SampleFormat, volume: f32) {
    let size = format.sample_size();
    let len = source.len().min(output.len()) / size * size;
    let samples = source[..len]
        .chunks_exact(size)
        .zip(output[..len].chunks_exact_mut(size));

    match format {
        SampleFormat::PcmInt8 => {
            for (src, dst) in samples {
                let mixed = mix_int(dst[0] as i8 as i64, src[0] as i8 as i64, volume, 8);
                dst[0] = mixed as i8 as u8;
            }
        }
        SampleFormat::PcmInt16 => {
            for (src, dst) in samples {
                let a = i16::from_le_bytes([dst[0], dst[1]]) as i64;
                let b = i16::from_le_bytes([src[0], src[1]]) as i64;
                dst.copy_from_slice(&(mix_int(a, b, volume, 16) as i16).to_le_bytes());
            }
        }
        SampleFormat::PcmInt24 => {
            for (src, dst) in samples {
                let a = read_i24(dst) as i64;
                let b = read_i24(src) as i64;
                let mixed = (mix_int(a, b, volume, 24) as i32).to_le_bytes();
                dst.copy_from_slice(&mixed[..3]);
            }
        }
        SampleFormat::PcmInt32 => {
            for (src, dst) in samples {
                let a = i32::from_le_bytes([dst[0], dst[1], dst[2], dst[3]]) as i64;
                let b = i32::from_le_bytes([src[0], src[1], src[2], src[3]]) as i64;
                dst.copy_from_slice(&(mix_int(a, b, volume, 32) as i32).to_le_bytes());
            }
        }
        SampleFormat::PcmFloat => {
            for (src, dst) in samples {
                let a = f32::from_le_bytes([dst[0], dst[1], dst[2], dst[3]]);
                let b = f32::from_le_bytes([src[0], src[1], src[2], src[3]]);
                let mixed = (a + b * volume).clamp(-1.0, 1.0);
                dst.copy_from_slice(&mixed.to_le_bytes());
            }
        }
    }
}

/// Add `sample * volume` to `base`, saturating to a signed integer of `bits`
fn mix_int(base: i64, sample: i64, volume: f32, bits: u32) -> i64 {
    let max = (1i64 << (bits - 1)) - 1;
    let min = -(1i64 << (bits - 1));
    let scaled = (sample as f64 * volume as f64) as i64;
    (base + scaled).clamp(min, max)
}

fn read_i24(bytes: &[u8]) -> i32 {
    // Sign extend through the top byte
    i32::from_le_bytes([0, bytes[0], bytes[1], bytes[2]]) >> 8
}
