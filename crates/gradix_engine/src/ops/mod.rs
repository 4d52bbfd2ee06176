mod binary;
mod conv;
mod matmul;
mod nn;

pub use nn::LstmCellFn;
mod reduce;
mod shape;
mod unary;
