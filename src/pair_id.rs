/// Largest image id COLMAP can pair; also the multiplier of the pair encoding.
pub const MAX_IMAGE_ID: u64 = 2_147_483_647;

/// Encodes an unordered image pair into COLMAP's `pair_id`.
///
/// The result is symmetric in its arguments. Ids at or above [`MAX_IMAGE_ID`]
/// produce colliding keys; callers are expected to validate ids beforehand.
pub fn image_ids_to_pair_id(image_id1: u32, image_id2: u32) -> u64 {
    let (lo, hi) = if image_id1 > image_id2 {
        (image_id2, image_id1)
    } else {
        (image_id1, image_id2)
    };
    MAX_IMAGE_ID * lo as u64 + hi as u64
}

/// Inverse of [`image_ids_to_pair_id`], smaller id first.
pub fn pair_id_to_image_ids(pair_id: u64) -> (u32, u32) {
    let image_id2 = (pair_id % MAX_IMAGE_ID) as u32;
    let image_id1 = ((pair_id - image_id2 as u64) / MAX_IMAGE_ID) as u32;
    (image_id1, image_id2)
}
