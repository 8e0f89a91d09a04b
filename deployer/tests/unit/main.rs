//! Integration tests for fwfleet

mod mock_device;
mod test_fsm;
mod test_upstream;
