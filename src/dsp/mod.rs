pub mod biquad;
pub mod common;
pub mod level;

// The core trait that all processing stages must implement
pub trait Stage: Send + 'static {
    // Process a single sample through this stage
    fn process(&mut self, input: f32) -> f32;

    // Process a block of samples through this stage
    fn process_block(&mut self, input: &mut [f32]) {
        for sample in input.iter_mut() {
            *sample = self.process(*sample);
        }
    }
}
