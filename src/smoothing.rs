//! Critically damped smoothing for animation parameters.
//!
//! [`SmoothedParameter`] eases a value toward a retargetable goal using a
//! spring that never oscillates, so abrupt target changes (user input,
//! scripted jumps) turn into gradual transitions. The integrator keeps a
//! velocity state across frames and is stable for variable time steps.

/// Value types that can be driven by the critically damped spring.
pub trait Smoothable: Copy + Default {
    /// Advance `current` toward `target` over `dt` seconds.
    ///
    /// `smooth_time` is roughly the time to cover most of the remaining
    /// distance; `max_speed` caps the rate of change. `dt` must be
    /// positive. `velocity` carries integrator state between calls.
    fn smooth_damp(
        current: Self,
        target: Self,
        velocity: &mut Self,
        smooth_time: f32,
        max_speed: f32,
        dt: f32,
    ) -> Self;
}

impl Smoothable for f32 {
    fn smooth_damp(
        current: Self,
        target: Self,
        velocity: &mut Self,
        smooth_time: f32,
        max_speed: f32,
        dt: f32,
    ) -> Self {
        let smooth_time = smooth_time.max(1e-4);
        let omega = 2.0 / smooth_time;

        // Pade approximation of e^-x, accurate for the step sizes a frame
        // loop produces.
        let x = omega * dt;
        let exp = 1.0 / (1.0 + x + 0.48 * x * x + 0.235 * x * x * x);

        let original_target = target;
        let max_change = max_speed * smooth_time;
        let change = (current - target).clamp(-max_change, max_change);
        let target = current - change;

        let temp = (*velocity + omega * change) * dt;
        *velocity = (*velocity - omega * temp) * exp;
        let mut output = target + (change + temp) * exp;

        // The spring is critically damped, but the approximation can still
        // step past the goal; clamp to it.
        if (original_target - current > 0.0) == (output > original_target) {
            output = original_target;
            *velocity = (output - original_target) / dt;
        }
        output
    }
}

impl Smoothable for glam::Vec3 {
    fn smooth_damp(
        current: Self,
        target: Self,
        velocity: &mut Self,
        smooth_time: f32,
        max_speed: f32,
        dt: f32,
    ) -> Self {
        let mut v = *velocity;
        let result = glam::Vec3::new(
            f32::smooth_damp(current.x, target.x, &mut v.x, smooth_time, max_speed, dt),
            f32::smooth_damp(current.y, target.y, &mut v.y, smooth_time, max_speed, dt),
            f32::smooth_damp(current.z, target.z, &mut v.z, smooth_time, max_speed, dt),
        );
        *velocity = v;
        result
    }
}

/// A value that glides toward its target instead of jumping.
#[derive(Debug, Clone, Copy)]
pub struct SmoothedParameter<T: Smoothable> {
    value: T,
    target: T,
    velocity: T,
    smooth_time: f32,
    max_speed: f32,
}

impl<T: Smoothable> SmoothedParameter<T> {
    /// Create a parameter already settled at `value`.
    pub fn new(value: T, smooth_time: f32) -> Self {
        Self {
            value,
            target: value,
            velocity: T::default(),
            smooth_time,
            max_speed: f32::INFINITY,
        }
    }

    /// Cap the rate of change.
    pub fn with_max_speed(mut self, max_speed: f32) -> Self {
        self.max_speed = max_speed;
        self
    }

    /// Current smoothed value.
    pub fn value(&self) -> T {
        self.value
    }

    /// Value the parameter is easing toward.
    pub fn target(&self) -> T {
        self.target
    }

    /// Retarget without disturbing the current value or velocity.
    pub fn set_target(&mut self, target: T) {
        self.target = target;
    }

    /// Jump straight to `value`, dropping any in-flight motion.
    pub fn snap_to(&mut self, value: T) {
        self.value = value;
        self.target = value;
        self.velocity = T::default();
    }

    /// Change how quickly the parameter follows its target.
    pub fn set_smooth_time(&mut self, smooth_time: f32) {
        self.smooth_time = smooth_time;
    }

    /// Advance by `dt` seconds and return the new value.
    pub fn update(&mut self, dt: f32) -> T {
        if dt > 0.0 {
            self.value = T::smooth_damp(
                self.value,
                self.target,
                &mut self.velocity,
                self.smooth_time,
                self.max_speed,
                dt,
            );
        }
        self.value
    }
}
