use minesweeper_engine as ms;
use wasm_bindgen::prelude::*;

/// A layout handed to JavaScript as flat row-major codes (`-1` for mines).
/// Dropping it, or calling `free()` from JavaScript, releases it.
#[wasm_bindgen]
pub struct BoardHandle {
    board: ms::Board,
}

#[wasm_bindgen]
impl BoardHandle {
    #[wasm_bindgen(getter)]
    pub fn rows(&self) -> usize {
        self.board.rows()
    }

    #[wasm_bindgen(getter)]
    pub fn cols(&self) -> usize {
        self.board.cols()
    }

    pub fn cells(&self) -> Vec<i32> {
        self.board.to_flat()
    }

    pub fn bbbv(&self) -> usize {
        ms::compute_3bv(&self.board)
    }

    pub fn release(self) {}
}

#[wasm_bindgen]
pub struct SolvableHandle {
    layout: ms::SolvableLayout,
}

#[wasm_bindgen]
impl SolvableHandle {
    #[wasm_bindgen(getter)]
    pub fn success(&self) -> bool {
        self.layout.success
    }

    #[wasm_bindgen(getter)]
    pub fn attempts(&self) -> usize {
        self.layout.attempts
    }

    pub fn board(&self) -> BoardHandle {
        BoardHandle {
            board: self.layout.board.clone(),
        }
    }

    pub fn release(self) {}
}

/// Probabilities as flat row-major values, `-1.0` for revealed cells.
#[wasm_bindgen]
pub struct InferenceHandle {
    inference: ms::Inference,
}

#[wasm_bindgen]
impl InferenceHandle {
    pub fn probabilities(&self) -> Vec<f64> {
        self.inference.probabilities.to_flat()
    }

    #[wasm_bindgen(getter)]
    pub fn min_mine_num(&self) -> usize {
        self.inference.min_mine_num
    }

    #[wasm_bindgen(getter)]
    pub fn mine_num(&self) -> usize {
        self.inference.mine_num
    }

    #[wasm_bindgen(getter)]
    pub fn max_mine_num(&self) -> usize {
        self.inference.max_mine_num
    }

    #[wasm_bindgen(getter)]
    pub fn clamped(&self) -> bool {
        self.inference.clamped
    }

    pub fn release(self) {}
}

#[wasm_bindgen]
pub fn compute_3bv(rows: usize, cols: usize, cells: Vec<i32>) -> Result<usize, String> {
    console_error_panic_hook::set_once();

    let board = ms::Board::from_flat(rows, cols, &cells).map_err(|e| e.to_string())?;
    Ok(ms::compute_3bv(&board))
}

#[wasm_bindgen]
pub fn generate_layout(
    rows: usize,
    cols: usize,
    mine_count: usize,
    safe_x: usize,
    safe_y: usize,
) -> Result<BoardHandle, String> {
    console_error_panic_hook::set_once();

    let board = ms::generate_layout(rows, cols, mine_count, safe_x, safe_y)
        .map_err(|e| e.to_string())?;
    Ok(BoardHandle { board })
}

/// Runs on the calling thread: the browser main thread cannot block on workers.
#[wasm_bindgen]
pub fn generate_solvable_layout(
    rows: usize,
    cols: usize,
    mine_count: usize,
    safe_x: usize,
    safe_y: usize,
    max_attempts: usize,
) -> Result<SolvableHandle, String> {
    console_error_panic_hook::set_once();

    let config = ms::SolvableConfig {
        workers: 1,
        ..ms::SolvableConfig::new(
            ms::LayoutConfig::new(rows, cols, mine_count, safe_x, safe_y),
            max_attempts,
        )
    };
    let layout = ms::generate_solvable_layout_with(&config).map_err(|e| e.to_string())?;
    Ok(SolvableHandle { layout })
}

/// `mine_count` up to 1.0 is read as a density, anything larger as a count.
#[wasm_bindgen]
pub fn infer_probabilities(
    rows: usize,
    cols: usize,
    cells: Vec<i32>,
    mine_count: f64,
) -> Result<InferenceHandle, String> {
    console_error_panic_hook::set_once();

    let game = ms::GameBoard::from_flat(rows, cols, &cells).map_err(|e| e.to_string())?;
    let inference = ms::infer_probabilities(&game, ms::MineCount::from_hint(mine_count))
        .map_err(|e| e.to_string())?;
    Ok(InferenceHandle { inference })
}

/// Opening probability of each cell in `targets`, given as row-major indices.
#[wasm_bindgen]
pub fn infer_opening_probabilities(
    rows: usize,
    cols: usize,
    cells: Vec<i32>,
    mine_count: f64,
    targets: Vec<usize>,
) -> Result<Vec<f64>, String> {
    console_error_panic_hook::set_once();

    let game = ms::GameBoard::from_flat(rows, cols, &cells).map_err(|e| e.to_string())?;
    let dims = game.dims();
    let points = targets
        .iter()
        .map(|&index| {
            if index < dims.area() {
                Ok(dims.point(index))
            } else {
                Err(format!("cell index {index} is outside the {rows}x{cols} board"))
            }
        })
        .collect::<Result<Vec<_>, String>>()?;
    ms::infer_opening_probabilities(&game, ms::MineCount::from_hint(mine_count), &points)
        .map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compute_3bv_from_flat_codes() {
        let cells = vec![-1, 1, 0, 1, -1];
        assert_eq!(compute_3bv(1, 5, cells).unwrap(), 1);
        assert!(compute_3bv(1, 5, vec![0, 0]).is_err());
    }

    #[test]
    fn test_layout_handle() {
        let handle = generate_layout(5, 6, 4, 0, 0).unwrap();
        assert_eq!(handle.rows(), 5);
        assert_eq!(handle.cols(), 6);
        let cells = handle.cells();
        assert_eq!(cells.len(), 30);
        assert_eq!(cells.iter().filter(|&&c| c == -1).count(), 4);
        handle.release();
    }

    #[test]
    fn test_solvable_handle() {
        let handle = generate_solvable_layout(2, 3, 1, 0, 0, 1).unwrap();
        assert!(!handle.success());
        assert_eq!(handle.attempts(), 1);
        assert_eq!(handle.board().cells().len(), 6);
        handle.release();
    }

    #[test]
    fn test_inference_handle() {
        let handle = infer_probabilities(1, 3, vec![10, 1, 10], 1.0).unwrap();
        // A full-density hint is clamped to the single feasible mine.
        assert_eq!(handle.mine_num(), 1);
        assert!(handle.clamped());
        assert_eq!(handle.probabilities(), vec![0.5, -1.0, 0.5]);
        handle.release();
    }

    #[test]
    fn test_opening_probabilities() {
        let odds = infer_opening_probabilities(1, 4, vec![10, 10, 10, 10], 1.0, vec![0, 1]);
        // A density of 1.0 puts a mine on every cell, so nothing opens.
        assert_eq!(odds.unwrap(), vec![0.0, 0.0]);

        let odds = infer_opening_probabilities(1, 4, vec![10, 10, 10, 10], 2.0, vec![0]).unwrap();
        assert!((odds[0] - 1.0 / 6.0).abs() < 1e-9);

        assert!(infer_opening_probabilities(1, 4, vec![10; 4], 2.0, vec![4]).is_err());
        assert!(infer_opening_probabilities(1, 4, vec![10; 4], f64::NAN, vec![0]).is_err());
    }

    #[test]
    fn test_errors_are_strings() {
        let err = infer_probabilities(1, 2, vec![3, 10], 1.0).err().unwrap();
        assert!(err.contains("no consistent"));
    }
}
