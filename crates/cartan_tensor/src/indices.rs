/// Maps the natural multi-index of a tensor shape onto offsets into packed
/// storage. Symmetric index pairs map equivalent entries to the same offset.
pub trait TensorIndex<const N: usize, const R: usize> {
    /// Converts a valid index into a buffer offset for tensor storage.
    fn offset_from_index(index: [usize; R]) -> usize;
    /// Counts all unique indices used to store the tensor.
    fn count() -> usize;
    /// Calls a function once for each unique index, in storage order.
    fn for_each_index(f: impl FnMut([usize; R]));
}

/// General tensor shape with no symmetries, Tᵢⱼₖ..., stored row-major.
pub struct Gen;

impl<const N: usize, const R: usize> TensorIndex<N, R> for Gen {
    fn offset_from_index(index: [usize; R]) -> usize {
        let mut result = 0;
        let mut stride = 1;

        for i in (0..R).rev() {
            result += stride * index[i];
            stride *= N;
        }

        result
    }

    fn count() -> usize {
        N.pow(R as u32)
    }

    fn for_each_index(mut f: impl FnMut([usize; R])) {
        if R == 0 {
            f([0; R]);
            return;
        }

        let mut cursor = [0; R];

        f(cursor);

        'l: loop {
            for slot in (0..R).rev() {
                cursor[slot] += 1;

                if cursor[slot] < N {
                    f(cursor);
                    continue 'l;
                }

                cursor[slot] = 0;
            }

            break;
        }
    }
}

/// A symmetric pair T₍ᵢⱼ₎, storing the lower triangle row-major.
pub struct Sym;

impl<const N: usize> TensorIndex<N, 2> for Sym {
    fn offset_from_index([mut row, mut col]: [usize; 2]) -> usize {
        if col > row {
            std::mem::swap(&mut row, &mut col);
        }

        // Gaussian addition gives the row offset into the triangle.
        row * (row + 1) / 2 + col
    }

    fn count() -> usize {
        N * (N + 1) / 2
    }

    fn for_each_index(mut f: impl FnMut([usize; 2])) {
        for row in 0..N {
            for col in 0..=row {
                f([row, col]);
            }
        }
    }
}

/// A rank-3 shape Tᵃ₍ᵦ𝒸₎ with a general first slot and a symmetric trailing
/// pair. This is the shape of the Christoffel symbols Γᵃ_bc.
pub struct VecSym;

impl<const N: usize> TensorIndex<N, 3> for VecSym {
    fn offset_from_index([a, b, c]: [usize; 3]) -> usize {
        a * <Sym as TensorIndex<N, 2>>::count()
            + <Sym as TensorIndex<N, 2>>::offset_from_index([b, c])
    }

    fn count() -> usize {
        N * <Sym as TensorIndex<N, 2>>::count()
    }

    fn for_each_index(mut f: impl FnMut([usize; 3])) {
        for a in 0..N {
            <Sym as TensorIndex<N, 2>>::for_each_index(|[b, c]| f([a, b, c]));
        }
    }
}
