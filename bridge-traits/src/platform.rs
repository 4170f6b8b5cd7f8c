/// `Send + Sync` bound shared by bridge traits whose implementations live
/// behind `Arc` and are called from spawned tasks.
pub trait PlatformSendSync: Send + Sync {}

impl<T> PlatformSendSync for T where T: Send + Sync {}
