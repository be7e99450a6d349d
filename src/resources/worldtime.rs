/// Frame clock shared with scripts through `Application.GetFrame()` and
/// `Application.GetTime()`.
#[derive(Debug, Clone, Copy)]
pub struct WorldTime {
    pub elapsed: f32,
    pub delta: f32,
    pub time_scale: f32,
    pub frame: u64,
}

impl Default for WorldTime {
    fn default() -> Self {
        WorldTime {
            elapsed: 0.0,
            delta: 0.0,
            time_scale: 1.0,
            frame: 0,
        }
    }
}

impl WorldTime {
    /// Advance by one frame of `delta` real seconds.
    pub fn advance(&mut self, delta: f32) {
        self.delta = delta * self.time_scale;
        self.elapsed += self.delta;
        self.frame += 1;
    }
}
