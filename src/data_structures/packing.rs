//! Rectangle packing for lightmaps and texture atlases.
//!
//! A shelf packer: rectangles are placed tallest first, left to right, opening
//! a new shelf when the current one is full. If the board is too small its
//! shorter side is doubled and packing starts over.

/// A rectangle to place, carrying an arbitrary payload.
#[derive(Clone, Debug, PartialEq)]
pub struct BoundedObject<T> {
    pub width: u32,
    pub height: u32,
    pub object: T,
}

/// A placed rectangle. `(x, y)` is the top-left corner on the board.
#[derive(Clone, Debug, PartialEq)]
pub struct PackedCell<T> {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub object: T,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Packing<T> {
    pub width: u32,
    pub height: u32,
    /// Same order as the input objects.
    pub cells: Vec<PackedCell<T>>,
}

fn try_pack(sizes: &[(u32, u32)], order: &[usize], width: u32, height: u32) -> Option<Vec<(u32, u32)>> {
    let mut positions = vec![(0, 0); sizes.len()];
    let (mut x, mut y, mut shelf_height) = (0u32, 0u32, 0u32);
    for &index in order {
        let (w, h) = sizes[index];
        if x + w > width {
            y += shelf_height;
            x = 0;
            shelf_height = 0;
        }
        if w > width || y + h > height {
            return None;
        }
        positions[index] = (x, y);
        x += w;
        shelf_height = shelf_height.max(h);
    }
    Some(positions)
}

/// Packs `objects` onto a board at least `min_width` x `min_height` large.
pub fn pack_cells<T>(objects: Vec<BoundedObject<T>>, min_width: u32, min_height: u32) -> Packing<T> {
    let sizes = objects
        .iter()
        .map(|object| (object.width, object.height))
        .collect::<Vec<_>>();
    let mut order = (0..objects.len()).collect::<Vec<_>>();
    order.sort_by(|&a, &b| sizes[b].1.cmp(&sizes[a].1).then(sizes[b].0.cmp(&sizes[a].0)));

    let widest = sizes.iter().map(|size| size.0).max().unwrap_or(0);
    let tallest = sizes.iter().map(|size| size.1).max().unwrap_or(0);
    let mut width = min_width.max(widest).max(1);
    let mut height = min_height.max(tallest).max(1);

    let positions = loop {
        if let Some(positions) = try_pack(&sizes, &order, width, height) {
            break positions;
        }
        if width <= height {
            width *= 2;
        } else {
            height *= 2;
        }
    };

    let cells = objects
        .into_iter()
        .zip(positions)
        .map(|(object, (x, y))| PackedCell {
            x,
            y,
            width: object.width,
            height: object.height,
            object: object.object,
        })
        .collect();

    Packing { width, height, cells }
}
