pub mod carbon;
pub mod country;
pub mod currency;
pub mod customer;
pub mod fee;
pub mod money;
pub mod organisation;
pub mod partner;
pub mod quote;
pub mod tax;
