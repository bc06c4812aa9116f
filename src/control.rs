use crate::surface::{ActionControl, ControlLabel};

/// Puts the control into its busy state and hands back a guard that restores
/// the idle state when dropped, whichever way the evaluation ends.
pub fn enter_busy<C: ActionControl>(control: &mut C) -> BusyGuard<'_, C> {
    control.set_disabled(true);
    control.set_label(ControlLabel::Busy);
    BusyGuard { control }
}

pub fn enter_idle<C: ActionControl + ?Sized>(control: &mut C) {
    control.set_label(ControlLabel::Idle);
    control.set_disabled(false);
}

#[must_use = "dropping the guard immediately restores the idle state"]
pub struct BusyGuard<'a, C: ActionControl> {
    control: &'a mut C,
}

impl<C: ActionControl> Drop for BusyGuard<'_, C> {
    fn drop(&mut self) {
        enter_idle(&mut *self.control);
    }
}
