use athanconfig::PlaybackSettings;

const MAX_VOLUME: i32 = 100;

/// Time-of-day volume when an event does not set one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VolumePolicy {
    pub night_start_hour: u32,
    pub night_end_hour: u32,
    pub night_volume: u8,
    pub day_volume: u8,
}

impl Default for VolumePolicy {
    fn default() -> Self {
        Self::from(&PlaybackSettings::default())
    }
}

impl From<&PlaybackSettings> for VolumePolicy {
    fn from(settings: &PlaybackSettings) -> Self {
        Self {
            night_start_hour: settings.night_start_hour,
            night_end_hour: settings.night_end_hour,
            night_volume: settings.night_volume,
            day_volume: settings.day_volume,
        }
    }
}

impl VolumePolicy {
    /// `[night_start, night_end)`, wrapping over midnight when start > end.
    /// An empty window (start == end) means there is no night.
    pub fn is_night(&self, hour: u32) -> bool {
        let (start, end) = (self.night_start_hour, self.night_end_hour);
        if start > end {
            hour >= start || hour < end
        } else {
            start <= hour && hour < end
        }
    }

    /// The override when it is above 0 (capped at 100), otherwise the
    /// level for `hour`
    pub fn effective(&self, volume_override: i32, hour: u32) -> u8 {
        if volume_override > 0 {
            volume_override.min(MAX_VOLUME) as u8
        } else if self.is_night(hour) {
            self.night_volume
        } else {
            self.day_volume
        }
    }
}
