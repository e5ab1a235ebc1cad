use bitflags::bitflags;

bitflags! {
    /// Ray types a shape is visible to, stored in the native `visibility`
    /// and `sidedness` bytes.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct RayType: u8 {
        const CAMERA            = 1 << 0;
        const SHADOW            = 1 << 1;
        const DIFFUSE_TRANSMIT  = 1 << 2;
        const SPECULAR_TRANSMIT = 1 << 3;
        const VOLUME            = 1 << 4;
        const DIFFUSE_REFLECT   = 1 << 5;
        const SPECULAR_REFLECT  = 1 << 6;
        const SUBSURFACE        = 1 << 7;
    }
}

impl RayType {
    /// Attribute suffixes (`ai:visibility:<suffix>`) paired with their ray bit.
    pub const ATTRIBUTE_NAMES: [(&'static str, RayType); 8] = [
        ("camera", RayType::CAMERA),
        ("shadow", RayType::SHADOW),
        ("diffuse_transmit", RayType::DIFFUSE_TRANSMIT),
        ("specular_transmit", RayType::SPECULAR_TRANSMIT),
        ("volume", RayType::VOLUME),
        ("diffuse_reflect", RayType::DIFFUSE_REFLECT),
        ("specular_reflect", RayType::SPECULAR_REFLECT),
        ("subsurface", RayType::SUBSURFACE),
    ];
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_rays_fill_a_byte() {
        assert_eq!(RayType::all().bits(), 0xff);
        let combined = RayType::ATTRIBUTE_NAMES
            .iter()
            .fold(RayType::empty(), |acc, (_, r)| acc | *r);
        assert_eq!(combined, RayType::all());
    }
}
