//! Common source fixtures for tests.

/// A header exercising most declaration kinds.
pub const GEOMETRY_H: &str = r#"
#include <cstddef>

namespace geo {

enum class Unit { Millimetre, Inch };

struct Point {
    double x;
    double y;
};

typedef Point Vec2;

class Shape {
public:
    Shape();
    virtual ~Shape();
    virtual double area() const = 0;
    const char* name() const;
protected:
    Unit unit;
private:
    friend class Canvas;
    int id;
};

class Circle : public Shape {
public:
    double area() const;
    Point centre;
    double radius;
};

template<class T, int N = 3>
struct Array {
    typedef T value_type;
    T items[N];
    T* begin();
};

template<>
struct Array<bool, 3> {
    unsigned bits;
};

namespace detail {
    inline namespace v2 {
        int counter;
    }
}

using Size = unsigned long;

}
"#;

/// Out-of-line definitions for [`GEOMETRY_H`].
pub const GEOMETRY_CPP: &str = r#"
#include "geometry.h"

using namespace geo;

double Circle::area() const {
    double r2 = radius * radius;
    return 3.14159 * r2;
}

const char* Shape::name() const { return "shape"; }
"#;

/// A class declared before it is defined, used in between.
pub const FORWARD_THEN_DEFINE: &str = r#"
struct Node;
struct List {
    Node* head;
};
struct Node {
    int value;
    Node* next;
};
"#;

/// Nested class declared in the body, defined out of line.
pub const NESTED_OUT_OF_LINE: &str = r#"
namespace io {
    class Stream {
        struct Buffer;
        Buffer* buffer;
    };
    struct Stream::Buffer {
        char data[64];
    };
}
"#;
