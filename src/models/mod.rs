pub mod id;
pub mod parcel;
pub mod payment;
