pub mod engine;
pub mod gradient;
pub mod traits;

pub use engine::{matrix_element, ob_me, ob_me_od, overlap, tb_me, tb_me_od};
pub use gradient::{
    grad_center_of_mass, grad_log_overlap, grad_matrix_element, grad_ob_me, grad_ob_me_od,
    grad_ob_partial, grad_tb_me, grad_tb_me_od, grad_tb_partial, rows_for, PartialGradient,
};
pub use traits::{GradOneBodyOperator, GradTwoBodyOperator, OneBodyOperator, OpValue, TwoBodyOperator};
