// One stereo frame, laid out like cpal's interleaved f32 buffers
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StereoFrame {
    pub left: f32,
    pub right: f32,
}

impl StereoFrame {
    pub fn mono(v: f32) -> Self {
        Self { left: v, right: v }
    }
}
