use crate::config::{MAX_INPUT_SIZE, TensorLayout};
use crate::error::ClassifierError;
use image::{DynamicImage, RgbImage};
use ndarray::Array4;
use std::path::Path;

/// Decode an uploaded file's bytes. The format is sniffed from the content.
pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage, ClassifierError> {
    if bytes.is_empty() {
        return Err(ClassifierError::image_decode("file is empty"));
    }
    Ok(image::load_from_memory(bytes)?)
}

/// Decode an image from disk.
pub fn open_image(path: &Path) -> Result<DynamicImage, ClassifierError> {
    let bytes = std::fs::read(path).map_err(|e| {
        ClassifierError::image_decode(format!("cannot read {}: {e}", path.display()))
    })?;
    decode_image(&bytes)
}

/// Build the model input: nearest-neighbour resize to `size`×`size`, alpha
/// dropped, channels scaled to `[0, 1]`, leading batch dimension of one.
pub fn to_input_tensor(
    img: &DynamicImage,
    size: u32,
    layout: TensorLayout,
) -> Result<Array4<f32>, ClassifierError> {
    if !(1..=MAX_INPUT_SIZE).contains(&size) {
        return Err(ClassifierError::inference(format!(
            "input size must be between 1 and {MAX_INPUT_SIZE}, got {size}"
        )));
    }
    if img.width() == 0 || img.height() == 0 {
        return Err(ClassifierError::inference("image has no pixels"));
    }
    let rgb = img.to_rgb8();
    let side = size as usize;
    let xs = nearest_indices(rgb.width(), size);
    let ys = nearest_indices(rgb.height(), size);

    let tensor = match layout {
        TensorLayout::Nhwc => Array4::from_shape_fn((1, side, side, 3), |(_, y, x, c)| {
            channel(&rgb, xs[x], ys[y], c)
        }),
        TensorLayout::Nchw => Array4::from_shape_fn((1, 3, side, side), |(_, c, y, x)| {
            channel(&rgb, xs[x], ys[y], c)
        }),
    };
    tracing::debug!(
        "prepared {:?} tensor {:?} from {}x{}",
        layout,
        tensor.shape(),
        img.width(),
        img.height()
    );
    Ok(tensor)
}

/// Source coordinate for each destination coordinate: `floor(dst * src / dst_len)`.
fn nearest_indices(src_len: u32, dst_len: u32) -> Vec<u32> {
    (0..dst_len)
        .map(|d| {
            let s = (u64::from(d) * u64::from(src_len)) / u64::from(dst_len);
            (s as u32).min(src_len - 1)
        })
        .collect()
}

fn channel(rgb: &RgbImage, x: u32, y: u32, c: usize) -> f32 {
    f32::from(rgb.get_pixel(x, y).0[c]) / 255.0
}
