//! Numeric scales between a device's integer step grid and the raw
//! floating-point value a [`ScaledValue`](crate::value::ScaledValue) stores.

use std::cell::RefCell;
use std::rc::Rc;

use mixtree_util::FactoryCache;

pub trait Scale {
    /// Raw value at grid position `step`. Out-of-grid steps are clamped.
    fn step_to_raw(&self, step: i32) -> f32;

    /// Grid position for `raw`, see [`quantize`]. Out-of-range values are clamped.
    fn raw_to_step(&self, raw: f32) -> i32;
}

/// Evenly spaced grid of `steps` points covering `[min, max]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearScale {
    min: f32,
    max: f32,
    steps: u32,
}

impl LinearScale {
    pub fn new(min: f32, max: f32, steps: u32) -> Self {
        Self {
            min,
            max,
            steps: steps.max(2),
        }
    }

    pub fn min(&self) -> f32 {
        self.min
    }

    pub fn max(&self) -> f32 {
        self.max
    }

    pub fn steps(&self) -> u32 {
        self.steps
    }

    fn last_step(&self) -> f32 {
        (self.steps - 1) as f32
    }
}

impl Scale for LinearScale {
    fn step_to_raw(&self, step: i32) -> f32 {
        let step = (step.max(0) as f32).min(self.last_step());
        self.min + step / self.last_step() * (self.max - self.min)
    }

    fn raw_to_step(&self, raw: f32) -> i32 {
        if self.max == self.min {
            return 0;
        }
        let normalized = (limit(raw, self.min, self.max) - self.min) / (self.max - self.min);
        (quantize(normalized, self.steps) * self.last_step()).round() as i32
    }
}

pub fn limit(value: f32, min: f32, max: f32) -> f32 {
    value.max(min).min(max)
}

/// Snap a normalized `value` in `[0, 1]` onto a grid of `steps` points.
///
/// Every grid point but the last owns an interval of width
/// `1 / (steps - 0.5)`; the last one owns the remaining half interval.
pub fn quantize(value: f32, steps: u32) -> f32 {
    if steps < 2 {
        return 0.0;
    }
    let cells = f64::from(steps) - 0.5;
    let last = f64::from(steps - 1);
    ((f64::from(value) * cells).trunc() / last) as f32
}

type ScaleKey = (u32, u32, u32);

fn create_linear(key: &ScaleKey) -> Rc<LinearScale> {
    Rc::new(LinearScale::new(f32::from_bits(key.0), f32::from_bits(key.1), key.2))
}

thread_local! {
    static LINEAR: RefCell<FactoryCache<ScaleKey, Rc<LinearScale>>> =
        RefCell::new(FactoryCache::new(create_linear as fn(&ScaleKey) -> Rc<LinearScale>));
}

/// Shared linear scale; identical parameters yield the same instance.
pub fn linear(min: f32, max: f32, steps: u32) -> Rc<LinearScale> {
    LINEAR.with(|cache| cache.borrow_mut().get((min.to_bits(), max.to_bits(), steps)))
}
