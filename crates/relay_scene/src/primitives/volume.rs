use relay_core::hash::ContentHasher;

/// A sparse volume stored in a file, rendered through the native `volume`
/// shape.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct VolumeObject {
    pub file_name: String,
    pub grids: Vec<String>,
}

impl VolumeObject {
    #[must_use]
    pub fn new(file_name: impl Into<String>, grids: Vec<String>) -> Self {
        Self {
            file_name: file_name.into(),
            grids,
        }
    }

    pub(crate) fn hash_into(&self, hasher: &mut ContentHasher) {
        hasher.add("volume").add(&self.file_name).add(&self.grids);
    }
}
