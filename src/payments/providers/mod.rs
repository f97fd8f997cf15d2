pub mod bkash;
