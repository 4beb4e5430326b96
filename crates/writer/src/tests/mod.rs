mod helpers;

mod estimation_tests;
mod label_tests;
