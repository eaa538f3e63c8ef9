use crate::traits::StorageEnableRuntimeConfig;
use pallet_file_system;
use pallet_payment_streams;
use pallet_proofs_dealer;
use pallet_storage_providers;

/// A merged view over every pallet event the client stack cares about.
///
/// The concrete aggregated runtime event enum is assembled outside this crate's scope
/// (by whatever `construct_runtime!` the node wires up); `Runtime::RuntimeEvent` is only
/// required to carry an `Into<EventsStorageEnable<Self>>` conversion so that the rest of
/// the client code can match on pallet events without naming that concrete enum.
#[derive(Debug)]
pub enum EventsStorageEnable<Runtime: StorageEnableRuntimeConfig> {
    FileSystem(pallet_file_system::Event<Runtime>),
    Providers(pallet_storage_providers::Event<Runtime>),
    PaymentStreams(pallet_payment_streams::Event<Runtime>),
    ProofsDealer(pallet_proofs_dealer::Event<Runtime>),
    System(frame_system::Event<Runtime>),
    Others,
}
