//! Animation curves: keyframes on one channel of one property, plus F-modifiers.

const FRAME_EPSILON: f32 = 1e-4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Interpolation {
    Constant,
    Linear,
    #[default]
    Bezier,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Keyframe {
    pub frame: f32,
    pub value: f32,
    /// Interpolation towards the next keyframe.
    pub interpolation: Interpolation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CycleMode {
    None,
    #[default]
    Repeat,
    RepeatWithOffset,
    RepeatMirrored,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FModifier {
    /// Repeats the keyed range outside of it.
    Cycles { before: CycleMode, after: CycleMode },
}

impl FModifier {
    pub fn cycles() -> Self {
        FModifier::Cycles {
            before: CycleMode::Repeat,
            after: CycleMode::Repeat,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FCurve {
    pub data_path: String,
    pub array_index: usize,
    keyframes: Vec<Keyframe>,
    pub modifiers: Vec<FModifier>,
}

impl FCurve {
    pub fn new(data_path: impl Into<String>, array_index: usize) -> Self {
        Self {
            data_path: data_path.into(),
            array_index,
            keyframes: Vec::new(),
            modifiers: Vec::new(),
        }
    }

    pub fn keyframes(&self) -> &[Keyframe] {
        &self.keyframes
    }

    /// Inserts a key, replacing the value of an existing key on the same frame.
    pub fn insert_keyframe(&mut self, frame: f32, value: f32) {
        if let Some(existing) = self
            .keyframes
            .iter_mut()
            .find(|key| (key.frame - frame).abs() < FRAME_EPSILON)
        {
            existing.value = value;
            return;
        }

        let position = self.keyframes.partition_point(|key| key.frame < frame);
        self.keyframes.insert(
            position,
            Keyframe {
                frame,
                value,
                interpolation: Interpolation::default(),
            },
        );
    }

    pub fn set_interpolation(&mut self, interpolation: Interpolation) {
        for key in &mut self.keyframes {
            key.interpolation = interpolation;
        }
    }

    pub fn add_modifier(&mut self, modifier: FModifier) -> &mut FModifier {
        self.modifiers.push(modifier);
        let last = self.modifiers.len() - 1;
        &mut self.modifiers[last]
    }

    pub fn range(&self) -> Option<(f32, f32)> {
        let first = self.keyframes.first()?;
        let last = self.keyframes.last()?;
        Some((first.frame, last.frame))
    }

    pub fn evaluate(&self, frame: f32) -> f32 {
        let (frame, offset) = self.modifiers.iter().fold((frame, 0.0), |(frame, offset), m| {
            let (frame, extra) = self.apply_modifier(m, frame);
            (frame, offset + extra)
        });

        self.evaluate_keys(frame) + offset
    }

    /// Maps `frame` into the keyed range; returns the remapped frame and a value offset.
    fn apply_modifier(&self, modifier: &FModifier, frame: f32) -> (f32, f32) {
        let FModifier::Cycles { before, after } = *modifier;

        let Some((start, end)) = self.range() else {
            return (frame, 0.0);
        };
        let length = end - start;
        if length <= FRAME_EPSILON {
            return (frame, 0.0);
        }

        let mode = if frame < start {
            before
        } else if frame > end {
            after
        } else {
            return (frame, 0.0);
        };

        let cycle = ((frame - start) / length).floor();
        let local = (frame - start) - cycle * length;

        match mode {
            CycleMode::None => (frame, 0.0),
            CycleMode::Repeat => (start + local, 0.0),
            CycleMode::RepeatWithOffset => {
                let delta = self.evaluate_keys(end) - self.evaluate_keys(start);
                (start + local, cycle * delta)
            }
            CycleMode::RepeatMirrored => {
                if (cycle as i64).rem_euclid(2) == 1 {
                    (end - local, 0.0)
                } else {
                    (start + local, 0.0)
                }
            }
        }
    }

    fn evaluate_keys(&self, frame: f32) -> f32 {
        let keys = &self.keyframes;

        let (Some(first), Some(last)) = (keys.first(), keys.last()) else {
            return 0.0;
        };
        if frame <= first.frame {
            return first.value;
        }
        if frame >= last.frame {
            return last.value;
        }

        let next = keys.partition_point(|key| key.frame <= frame);
        let i = next - 1;
        let (k0, k1) = (keys[i], keys[next]);
        let span = k1.frame - k0.frame;
        let t = (frame - k0.frame) / span;

        match k0.interpolation {
            Interpolation::Constant => k0.value,
            Interpolation::Linear => k0.value + (k1.value - k0.value) * t,
            Interpolation::Bezier => {
                let m0 = self.auto_clamped_slope(i) * span;
                let m1 = self.auto_clamped_slope(next) * span;
                hermite(k0.value, m0, k1.value, m1, t)
            }
        }
    }

    /// True when the first modifier repeats the keyed range on both sides,
    /// which makes auto handles wrap around the cycle.
    fn is_cyclic(&self) -> bool {
        let repeats = |mode: CycleMode| {
            matches!(mode, CycleMode::Repeat | CycleMode::RepeatWithOffset)
        };

        match self.modifiers.first() {
            Some(FModifier::Cycles { before, after }) => repeats(*before) && repeats(*after),
            None => false,
        }
    }

    /// Neighbours of key `i`. On cyclic curves the ends borrow the keys on the
    /// other side of the cycle, shifted by one period in time and value.
    fn neighbours(&self, i: usize) -> Option<(Keyframe, Keyframe)> {
        let keys = &self.keyframes;
        let n = keys.len();
        let (first, last) = (keys[0], keys[n - 1]);
        let period = last.frame - first.frame;
        let cyclic = n >= 2 && period > FRAME_EPSILON && self.is_cyclic();

        let shifted = |key: Keyframe, cycles: f32| Keyframe {
            frame: key.frame + cycles * period,
            value: key.value + cycles * (last.value - first.value),
            ..key
        };

        let previous = match i {
            0 if cyclic => shifted(keys[n - 2], -1.0),
            0 => return None,
            _ => keys[i - 1],
        };
        let next = if i + 1 < n {
            keys[i + 1]
        } else if cyclic {
            shifted(keys[1], 1.0)
        } else {
            return None;
        };

        Some((previous, next))
    }

    /// Slope per frame at key `i`: flat at the ends of non-cyclic curves and at local extrema.
    fn auto_clamped_slope(&self, i: usize) -> f32 {
        let Some((previous, next)) = self.neighbours(i) else {
            return 0.0;
        };
        let current = self.keyframes[i];

        let rising = current.value - previous.value;
        let falling = next.value - current.value;
        if rising * falling <= 0.0 {
            return 0.0;
        }

        (next.value - previous.value) / (next.frame - previous.frame)
    }
}

fn hermite(p0: f32, m0: f32, p1: f32, m1: f32, t: f32) -> f32 {
    let t2 = t * t;
    let t3 = t2 * t;

    (2.0 * t3 - 3.0 * t2 + 1.0) * p0
        + (t3 - 2.0 * t2 + t) * m0
        + (-2.0 * t3 + 3.0 * t2) * p1
        + (t3 - t2) * m1
}
