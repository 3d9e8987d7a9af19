//! Pick-first strategy, the default policy.

use crate::load_balancer::{
    FailingPicker, PickError, Picker, PickerBuilder, ReadyConnectionSet, SubConn,
};

pub const NAME: &str = "pick_first";

#[derive(Debug, Default)]
pub struct PickFirstBuilder;

impl PickerBuilder for PickFirstBuilder {
    fn name(&self) -> &str {
        NAME
    }

    fn build(&self, ready: &ReadyConnectionSet) -> Box<dyn Picker> {
        match ready.first() {
            Some(rc) => Box::new(PickFirstPicker { subconn: rc.subconn.clone() }),
            None => Box::new(FailingPicker::unavailable()),
        }
    }
}

/// Always returns the first ready connection in endpoint order.
#[derive(Debug)]
pub struct PickFirstPicker {
    subconn: SubConn,
}

impl Picker for PickFirstPicker {
    fn pick(&self) -> Result<SubConn, PickError> {
        Ok(self.subconn.clone())
    }
}
