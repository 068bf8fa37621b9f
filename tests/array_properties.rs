//! Property tests for the array core

use num_complex::Complex64;
use proptest::prelude::*;
use recon_core::{MultiAxisArray, AXES};

fn extents() -> impl Strategy<Value = Vec<usize>> {
    prop::collection::vec(1usize..5, 1..5)
}

fn complex_matrix() -> impl Strategy<Value = MultiAxisArray<Complex64>> {
    (1usize..6, 1usize..6).prop_flat_map(|(m, n)| {
        prop::collection::vec((-10.0f64..10.0, -10.0f64..10.0), m * n).prop_map(move |v| {
            MultiAxisArray::from_vec(&[m, n], v.into_iter().map(|(re, im)| Complex64::new(re, im)).collect())
        })
    })
}

proptest! {
    #[test]
    fn size_is_product_of_extents(ext in extents()) {
        let a: MultiAxisArray<f32> = MultiAxisArray::from_extents(&ext);
        prop_assert_eq!(a.size(), ext.iter().product::<usize>());
        prop_assert_eq!(a.as_slice().len(), a.size());
        prop_assert!(a.dims().iter().all(|&d| d >= 1));
        prop_assert_eq!(a.dims().len(), AXES);
    }

    #[test]
    fn reset_to_zero_fills_new_extents(ext in extents(), new in extents()) {
        let mut a = MultiAxisArray::from_fn(&ext, |i| i as f64 + 1.0);
        let mut dims = [1usize; AXES];
        dims[..new.len()].copy_from_slice(&new);
        a.reset_to(dims);
        prop_assert_eq!(a.dims(), dims);
        prop_assert_eq!(a.size(), new.iter().product::<usize>());
        prop_assert!(a.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn offsets_are_column_major(ext in extents(), seed in any::<u64>()) {
        let a = MultiAxisArray::from_fn(&ext, |i| i as f64);
        let dims = a.dims();
        let mut idx = [0usize; AXES];
        let mut rest = seed as usize;
        for (axis, i) in idx.iter_mut().enumerate() {
            *i = rest % dims[axis];
            rest /= dims[axis].max(2);
        }
        let mut expected = 0;
        let mut stride = 1;
        for axis in 0..AXES {
            expected += idx[axis] * stride;
            stride *= dims[axis];
        }
        prop_assert_eq!(a.offset_of(&idx), expected);
        prop_assert_eq!(a.at_axes(&idx), expected as f64);
    }

    #[test]
    fn clone_is_independent(ext in extents(), value in -5.0f64..5.0) {
        let a = MultiAxisArray::from_fn(&ext, |i| i as f64);
        let mut b = a.clone();
        b[0] = value + 100.0;
        prop_assert_eq!(a[0], 0.0);
        prop_assert_eq!(b[0], value + 100.0);
    }

    #[test]
    fn transpose_is_involution(a in complex_matrix()) {
        let t = a.tr();
        prop_assert_eq!(t.dim(0), a.dim(1));
        prop_assert_eq!(t.dim(1), a.dim(0));
        prop_assert_eq!(t.tr(), a);
    }

    #[test]
    fn norm_matches_self_dot(a in complex_matrix()) {
        let n2 = a.norm().powi(2);
        let d = a.dotc(&a);
        prop_assert!((d.re - n2).abs() <= 1e-9 * n2.max(1.0));
        prop_assert!(d.im.abs() <= 1e-9 * n2.max(1.0));
    }

    #[test]
    fn division_by_zero_element_writes_zero(v in prop::collection::vec(-3.0f64..3.0, 1..20)) {
        let a = MultiAxisArray::from_vec(&[v.len()], v.clone());
        let zeros: MultiAxisArray<f64> = MultiAxisArray::new1(v.len());
        let q = &a / &zeros;
        prop_assert!(q.iter().all(|&x| x == 0.0));
    }
}
